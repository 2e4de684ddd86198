use crate::data::WorldData;
use crate::template::{ComponentCreator, TemplateError, Templates};
use kindle_core::ecs::{Entity, Registry};

/// Spawn every object of the world description.
///
/// An object either names a template, lists its own components, or both; the
/// listed components are applied on top of the template's.
pub fn spawn_world(
    world: &WorldData,
    templates: &Templates,
    registry: &mut Registry,
) -> Result<Vec<Entity>, TemplateError> {
    let mut spawned = Vec::with_capacity(world.objects.len());
    for object in &world.objects {
        let entity = match &object.template {
            Some(name) => templates.create(name, registry)?,
            None => registry.create(),
        };
        for def in &object.components {
            if let Some(creator) = ComponentCreator::from_def(def, registry) {
                creator.create(registry, entity)?;
            }
        }
        if object.template.is_none() {
            registry.post_create(entity);
        }
        spawned.push(entity);
    }
    tracing::info!(count = spawned.len(), "spawned world objects");
    Ok(spawned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GameData;
    use kindle_core::ecs::ComponentInit;
    use kindle_core::glam::Vec2;

    #[test]
    fn spawn_templates_and_plain_objects() {
        let game = GameData::from_json(
            r#"{"templates": [{"name": "player", "components": [
                {"position": {"x": 0, "y": -100}},
                {"custom": {"name": "Player"}}
            ]}]}"#,
        )
        .unwrap();
        let world = WorldData::from_json(
            r#"{"objects": [
                {"template": "player", "components": [{"position": {"x": 20, "y": -100}}]},
                {"components": [{"position": {"x": 1, "y": 1}}]}
            ]}"#,
        )
        .unwrap();

        let mut registry = Registry::new();
        let player = registry.register("Player", ComponentInit::Empty).unwrap();
        let mut templates = Templates::new();
        templates.declare(&game);
        templates.resolve(&game, &registry);

        let spawned = spawn_world(&world, &templates, &mut registry).unwrap();
        assert_eq!(spawned.len(), 2);
        assert!(registry.has(spawned[0], player));
        assert_eq!(registry.position2(spawned[0]), Some(&Vec2::new(20.0, -100.0)));
        assert!(!registry.has(spawned[1], player));
        assert_eq!(registry.take_created(), spawned);
    }

    #[test]
    fn unknown_template_fails() {
        let world = WorldData::from_json(r#"{"objects": [{"template": "boss"}]}"#).unwrap();
        let mut registry = Registry::new();
        let err = spawn_world(&world, &Templates::new(), &mut registry).unwrap_err();
        assert!(matches!(err, TemplateError::Unknown { .. }));
    }
}
