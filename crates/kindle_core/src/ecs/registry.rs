// registry.rs - Entity and component store
//
// Owns entity identity, the component type table and one storage list per
// component type. Entity destruction is deferred until `remove_removed` so
// queries taken during a frame stay valid for the whole frame.

use super::entity::EntityAllocator;
use super::storage::ComponentList;
use super::{
    ComponentId, ComponentInit, ComponentKind, ComponentType, ComponentValue, CustomArguments,
    Entity, Fields, POSITION2_NAME,
};
use glam::Vec2;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("component id {0} is not registered")]
    UnknownComponent(ComponentId),
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),
    #[error("component '{name}' ({component}) does not hold {expected:?} data")]
    KindMismatch {
        component: ComponentId,
        name: String,
        expected: ComponentKind,
    },
    #[error("component name '{0}' is reserved for a built-in component")]
    ReservedName(String),
}

/// A custom component that was attached with a `Deferred` initializer and
/// still needs its script-side initializer to run.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingInit {
    pub entity: Entity,
    pub component: ComponentId,
    pub arguments: CustomArguments,
}

pub struct Registry {
    entities: EntityAllocator,
    types: Vec<ComponentType>,
    by_name: HashMap<String, ComponentId>,
    stores: Vec<ComponentList>,
    removed: Vec<Entity>,
    created: Vec<Entity>,
    pending_inits: Vec<PendingInit>,
    position2: ComponentId,
}

impl Registry {
    /// Create an empty registry with the built-in Position2 type registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entities: EntityAllocator::new(),
            types: Vec::new(),
            by_name: HashMap::new(),
            stores: Vec::new(),
            removed: Vec::new(),
            created: Vec::new(),
            pending_inits: Vec::new(),
            position2: 0,
        };
        registry.position2 =
            registry.push_type(POSITION2_NAME, ComponentKind::Position2, ComponentInit::Empty);
        registry
    }

    fn push_type(&mut self, name: &str, kind: ComponentKind, init: ComponentInit) -> ComponentId {
        let id = self.types.len() as ComponentId;
        self.types.push(ComponentType {
            id,
            name: name.to_string(),
            kind,
            init,
        });
        self.stores.push(ComponentList::new());
        self.by_name.insert(name.to_string(), id);
        id
    }

    // ------------------------------------------------------------------
    // Component types
    // ------------------------------------------------------------------

    /// Type id of the built-in 2D position component.
    pub fn position2_id(&self) -> ComponentId {
        self.position2
    }

    /// Register a named custom component type, or return the id it already has.
    ///
    /// Re-registering (for example when a script is reloaded) keeps the id and
    /// replaces the initializer.
    pub fn register(
        &mut self,
        name: &str,
        init: ComponentInit,
    ) -> Result<ComponentId, RegistryError> {
        if let Some(&id) = self.by_name.get(name) {
            let ty = &mut self.types[id as usize];
            if ty.kind != ComponentKind::Custom {
                return Err(RegistryError::ReservedName(name.to_string()));
            }
            tracing::debug!(component = name, id, "re-registering component type");
            ty.init = init;
            return Ok(id);
        }

        let id = self.push_type(name, ComponentKind::Custom, init);
        tracing::debug!(component = name, id, "registered component type");
        Ok(id)
    }

    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    pub fn component_type(&self, id: ComponentId) -> Option<&ComponentType> {
        self.types.get(id as usize)
    }

    pub fn component_name(&self, id: ComponentId) -> Option<&str> {
        self.component_type(id).map(|ty| ty.name.as_str())
    }

    pub fn component_types(&self) -> impl Iterator<Item = &ComponentType> {
        self.types.iter()
    }

    fn expect_kind(
        &self,
        id: ComponentId,
        expected: ComponentKind,
    ) -> Result<&ComponentType, RegistryError> {
        let ty = self
            .component_type(id)
            .ok_or(RegistryError::UnknownComponent(id))?;
        if ty.kind != expected {
            return Err(RegistryError::KindMismatch {
                component: id,
                name: ty.name.clone(),
                expected,
            });
        }
        Ok(ty)
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    pub fn create(&mut self) -> Entity {
        self.entities.allocate()
    }

    /// Announce that an entity is fully built; init systems pick it up.
    pub fn post_create(&mut self, entity: Entity) {
        if self.is_alive(entity) {
            self.created.push(entity);
        }
    }

    /// Mark an entity for removal at the end of the frame.
    ///
    /// Returns false if the entity is already dead or already marked.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) || self.removed.contains(&entity) {
            return false;
        }
        self.removed.push(entity);
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn is_removed(&self, entity: Entity) -> bool {
        self.removed.contains(&entity)
    }

    /// Drop every entity marked by `destroy`, returning how many went away.
    pub fn remove_removed(&mut self) -> usize {
        let removed = std::mem::take(&mut self.removed);
        for &entity in &removed {
            for store in &mut self.stores {
                store.remove(entity);
            }
            self.entities.deallocate(entity);
        }
        self.created.retain(|e| !removed.contains(e));
        self.pending_inits.retain(|p| !removed.contains(&p.entity));
        if !removed.is_empty() {
            tracing::trace!(count = removed.len(), "removed entities");
        }
        removed.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.count()
    }

    /// Entities announced through `post_create` since the last call.
    pub fn take_created(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.created)
    }

    /// Custom components waiting on a script-side initializer.
    pub fn take_pending_inits(&mut self) -> Vec<PendingInit> {
        std::mem::take(&mut self.pending_inits)
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Attach (or replace) a component, returning the previous value.
    pub fn add(
        &mut self,
        entity: Entity,
        component: ComponentId,
        value: ComponentValue,
    ) -> Result<Option<ComponentValue>, RegistryError> {
        if !self.is_alive(entity) {
            return Err(RegistryError::DeadEntity(entity));
        }
        self.expect_kind(component, value.kind())?;
        Ok(self.stores[component as usize].insert(entity, value))
    }

    /// Attach a custom component built from template arguments by the type's initializer.
    pub fn add_custom(
        &mut self,
        entity: Entity,
        component: ComponentId,
        arguments: &CustomArguments,
    ) -> Result<(), RegistryError> {
        let init = self
            .expect_kind(component, ComponentKind::Custom)?
            .init
            .clone();
        let fields = match init {
            ComponentInit::Empty => Fields::new(),
            ComponentInit::Native(initializer) => initializer(arguments),
            ComponentInit::Deferred => Fields::new(),
        };
        self.add(entity, component, ComponentValue::Custom(fields))?;
        if let ComponentInit::Deferred = self.types[component as usize].init {
            self.pending_inits.push(PendingInit {
                entity,
                component,
                arguments: arguments.clone(),
            });
        }
        Ok(())
    }

    pub fn remove(&mut self, entity: Entity, component: ComponentId) -> Option<ComponentValue> {
        self.stores.get_mut(component as usize)?.remove(entity)
    }

    pub fn get(&self, entity: Entity, component: ComponentId) -> Option<&ComponentValue> {
        self.stores.get(component as usize)?.get(entity)
    }

    pub fn get_mut(
        &mut self,
        entity: Entity,
        component: ComponentId,
    ) -> Option<&mut ComponentValue> {
        self.stores.get_mut(component as usize)?.get_mut(entity)
    }

    pub fn has(&self, entity: Entity, component: ComponentId) -> bool {
        self.stores
            .get(component as usize)
            .is_some_and(|store| store.contains(entity))
    }

    /// Whether the entity holds every listed component type.
    pub fn has_components(&self, entity: Entity, components: &[ComponentId]) -> bool {
        components.iter().all(|&c| self.has(entity, c))
    }

    pub fn position2(&self, entity: Entity) -> Option<&Vec2> {
        self.get(entity, self.position2)?.as_position2()
    }

    pub fn position2_mut(&mut self, entity: Entity) -> Option<&mut Vec2> {
        let id = self.position2;
        self.get_mut(entity, id)?.as_position2_mut()
    }

    /// Replace the entity's position, attaching the component if needed.
    pub fn set_position2(&mut self, entity: Entity, vec: Vec2) -> Result<(), RegistryError> {
        self.add(entity, self.position2, ComponentValue::Position2(vec))
            .map(|_| ())
    }

    pub fn fields(&self, entity: Entity, component: ComponentId) -> Option<&Fields> {
        self.get(entity, component)?.as_fields()
    }

    pub fn fields_mut(&mut self, entity: Entity, component: ComponentId) -> Option<&mut Fields> {
        self.get_mut(entity, component)?.as_fields_mut()
    }

    /// Replace a custom component's fields, attaching the component if needed.
    pub fn set_fields(
        &mut self,
        entity: Entity,
        component: ComponentId,
        fields: Fields,
    ) -> Result<(), RegistryError> {
        self.add(entity, component, ComponentValue::Custom(fields))
            .map(|_| ())
    }

    /// Custom component fields, attaching an empty component first if missing.
    pub fn fields_or_insert(
        &mut self,
        entity: Entity,
        component: ComponentId,
    ) -> Result<&mut Fields, RegistryError> {
        if !self.has(entity, component) {
            self.set_fields(entity, component, Fields::new())?;
        }
        self.fields_mut(entity, component)
            .ok_or(RegistryError::UnknownComponent(component))
    }

    /// Entities holding every listed component type, ordered by entity index.
    ///
    /// The result is a snapshot: components added or entities destroyed while
    /// iterating it do not change it. An empty list yields no entities.
    pub fn entities(&self, components: &[ComponentId]) -> Vec<Entity> {
        let mut stores = Vec::with_capacity(components.len());
        for &c in components {
            match self.stores.get(c as usize) {
                Some(store) => stores.push(store),
                None => return Vec::new(),
            }
        }
        stores.sort_by_key(|store| store.len());

        let Some((smallest, rest)) = stores.split_first() else {
            return Vec::new();
        };
        smallest
            .entities()
            .filter(|&e| rest.iter().all(|store| store.contains(e)))
            .collect()
    }

    /// Number of entities holding a component type.
    pub fn count(&self, component: ComponentId) -> usize {
        self.stores
            .get(component as usize)
            .map_or(0, ComponentList::len)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
