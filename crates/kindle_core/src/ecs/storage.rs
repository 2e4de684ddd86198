//! Per-type component storage.
//!
//! Each registered component type owns one `ComponentList`. Entries are keyed
//! by entity in sorted order, so the key set doubles as the type's
//! owning-entity index and multi-type queries are a sorted intersection.

use super::{ComponentValue, Entity};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct ComponentList {
    data: BTreeMap<Entity, ComponentValue>,
}

impl ComponentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity, value: ComponentValue) -> Option<ComponentValue> {
        self.data.insert(entity, value)
    }

    pub fn remove(&mut self, entity: Entity) -> Option<ComponentValue> {
        self.data.remove(&entity)
    }

    pub fn get(&self, entity: Entity) -> Option<&ComponentValue> {
        self.data.get(&entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut ComponentValue> {
        self.data.get_mut(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.data.contains_key(&entity)
    }

    /// Entities holding this component, in ascending order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.data.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &ComponentValue)> {
        self.data.iter().map(|(entity, value)| (*entity, value))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Fields;
    use glam::Vec2;

    #[test]
    fn test_component_list() {
        let mut list = ComponentList::new();
        let a = Entity::new(3, 0);
        let b = Entity::new(1, 0);

        list.insert(a, ComponentValue::Position2(Vec2::new(1.0, 2.0)));
        list.insert(b, ComponentValue::Custom(Fields::new().with("time", 1.0)));

        assert_eq!(list.len(), 2);
        assert!(list.contains(a));
        assert_eq!(list.entities().collect::<Vec<_>>(), vec![b, a]);

        list.remove(a);
        assert!(!list.contains(a));
        assert_eq!(list.len(), 1);
    }
}
