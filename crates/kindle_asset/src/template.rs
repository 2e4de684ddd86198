//! Object templates: named entity blueprints.
//!
//! Templates are declared by name as soon as the game data is read, so a
//! script can look them up while it loads. Their component creators are
//! resolved later, once the script has registered its custom component types.

use crate::data::{ComponentDef, GameData, TemplateDef};
use kindle_core::ecs::{ComponentId, CustomArguments, Entity, Registry, RegistryError};
use kindle_core::glam::Vec2;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("unknown template '{name}', could be {known}")]
    Unknown { name: String, known: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Adds one component to a freshly created entity.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentCreator {
    Position2(Vec2),
    Custom {
        component: ComponentId,
        arguments: CustomArguments,
    },
}

impl ComponentCreator {
    /// Build a creator from its description, or log why it can't be built.
    pub fn from_def(def: &ComponentDef, registry: &Registry) -> Option<ComponentCreator> {
        match def {
            ComponentDef::Position { x, y } => Some(ComponentCreator::Position2(Vec2::new(*x, *y))),
            ComponentDef::Custom { name, arguments } => {
                let Some(component) = registry.component_id(name) else {
                    tracing::error!(component = %name, "unknown custom component");
                    return None;
                };
                let mut args = CustomArguments::new();
                for arg in arguments {
                    match arg.number {
                        Some(value) => args.insert(arg.name.clone(), value),
                        None => tracing::error!(
                            component = %name,
                            argument = %arg.name,
                            "argument is not a number"
                        ),
                    }
                }
                Some(ComponentCreator::Custom {
                    component,
                    arguments: args,
                })
            }
        }
    }

    pub fn create(&self, registry: &mut Registry, entity: Entity) -> Result<(), RegistryError> {
        match self {
            ComponentCreator::Position2(vec) => registry.set_position2(entity, *vec),
            ComponentCreator::Custom {
                component,
                arguments,
            } => registry.add_custom(entity, *component, arguments),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectTemplate {
    name: String,
    components: Vec<ComponentCreator>,
}

impl ObjectTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    pub fn with(mut self, creator: ComponentCreator) -> Self {
        self.components.push(creator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[ComponentCreator] {
        &self.components
    }

    /// Instantiate the blueprint as a new entity and announce it to init systems.
    ///
    /// Every entity gets its own copy of the blueprint's values.
    pub fn create(&self, registry: &mut Registry) -> Result<Entity, TemplateError> {
        let entity = registry.create();
        for creator in &self.components {
            if let Err(err) = creator.create(registry, entity) {
                registry.destroy(entity);
                return Err(err.into());
            }
        }
        registry.post_create(entity);
        tracing::trace!(template = %self.name, %entity, "created object");
        Ok(entity)
    }

    fn resolve(&mut self, def: &TemplateDef, registry: &Registry) {
        self.components = def
            .components
            .iter()
            .filter_map(|c| ComponentCreator::from_def(c, registry))
            .collect();
    }
}

#[derive(Clone, Debug, Default)]
pub struct Templates {
    templates: BTreeMap<String, ObjectTemplate>,
}

impl Templates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every template by name, without components.
    pub fn declare(&mut self, game: &GameData) {
        for def in &game.templates {
            self.templates
                .entry(def.name.clone())
                .or_insert_with(|| ObjectTemplate::new(def.name.clone()));
        }
    }

    /// Fill in the component creators of every template.
    ///
    /// Must run after the script registered its component types.
    pub fn resolve(&mut self, game: &GameData, registry: &Registry) {
        for def in &game.templates {
            let template = self
                .templates
                .entry(def.name.clone())
                .or_insert_with(|| ObjectTemplate::new(def.name.clone()));
            template.resolve(def, registry);
        }
        tracing::debug!(count = self.templates.len(), "resolved templates");
    }

    pub fn insert(&mut self, template: ObjectTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Look a template up by name, logging the known names on a miss.
    pub fn find(&self, name: &str) -> Option<&ObjectTemplate> {
        let found = self.templates.get(name);
        if found.is_none() {
            tracing::error!(
                "Unable to find template {name}, could be {}",
                self.known_names()
            );
        }
        found
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Create an entity from the named template.
    pub fn create(&self, name: &str, registry: &mut Registry) -> Result<Entity, TemplateError> {
        match self.templates.get(name) {
            Some(template) => template.create(registry),
            None => Err(TemplateError::Unknown {
                name: name.to_string(),
                known: self.known_names(),
            }),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn known_names(&self) -> String {
        english_or(&self.names().collect::<Vec<_>>())
    }
}

/// "a", "a or b", "a, b or c"
fn english_or(names: &[&str]) -> String {
    match names {
        [] => "nothing".to_string(),
        [one] => (*one).to_string(),
        [rest @ .., last] => format!("{} or {last}", rest.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VarDef;
    use kindle_core::ecs::{ComponentInit, Fields};

    fn shooter_game() -> GameData {
        GameData::from_json(
            r#"{
                "templates": [
                    {"name": "player", "components": [
                        {"position": {"x": 0, "y": -100}},
                        {"custom": {"name": "Player"}}
                    ]},
                    {"name": "shot", "components": [
                        {"position": {"x": 0, "y": 0}},
                        {"custom": {"name": "TimeOut", "arguments": [
                            {"name": "time", "number": 3},
                            {"name": "label"}
                        ]}},
                        {"custom": {"name": "Missing"}}
                    ]}
                ]
            }"#,
        )
        .unwrap()
    }

    fn shooter_registry() -> (Registry, ComponentId, ComponentId) {
        let mut registry = Registry::new();
        let player = registry.register("Player", ComponentInit::Empty).unwrap();
        let timeout = registry
            .register(
                "TimeOut",
                ComponentInit::native(|args| Fields::new().with("time", args.number("time"))),
            )
            .unwrap();
        (registry, player, timeout)
    }

    #[test]
    fn declared_templates_are_findable_before_resolve() {
        let mut templates = Templates::new();
        templates.declare(&shooter_game());
        assert!(templates.find("shot").is_some());
        assert!(templates.find("shot").unwrap().components().is_empty());
        assert!(templates.find("boss").is_none());
    }

    #[test]
    fn resolve_skips_unknown_components_and_bad_arguments() {
        let game = shooter_game();
        let (registry, _, timeout) = shooter_registry();
        let mut templates = Templates::new();
        templates.declare(&game);
        templates.resolve(&game, &registry);

        let shot = templates.find("shot").unwrap();
        assert_eq!(
            shot.components(),
            &[
                ComponentCreator::Position2(Vec2::ZERO),
                ComponentCreator::Custom {
                    component: timeout,
                    arguments: CustomArguments::new().with_number("time", 3.0),
                },
            ]
        );
    }

    #[test]
    fn create_applies_blueprint_without_aliasing() {
        let game = shooter_game();
        let (mut registry, player, timeout) = shooter_registry();
        let mut templates = Templates::new();
        templates.declare(&game);
        templates.resolve(&game, &registry);

        let a = templates.create("shot", &mut registry).unwrap();
        let b = templates.create("shot", &mut registry).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.fields(a, timeout).unwrap().number("time"), Some(3.0));

        registry.set_position2(a, Vec2::new(5.0, 5.0)).unwrap();
        assert_eq!(registry.position2(b), Some(&Vec2::ZERO));
        let again = templates.create("shot", &mut registry).unwrap();
        assert_eq!(registry.position2(again), Some(&Vec2::ZERO));

        let p = templates.create("player", &mut registry).unwrap();
        assert!(registry.has(p, player));
        assert_eq!(registry.take_created(), vec![a, b, again, p]);
    }

    #[test]
    fn unknown_template_lists_known_names() {
        let mut templates = Templates::new();
        templates.declare(&shooter_game());
        let mut registry = Registry::new();
        assert_eq!(
            templates.create("boss", &mut registry),
            Err(TemplateError::Unknown {
                name: "boss".to_string(),
                known: "player or shot".to_string(),
            })
        );
    }

    #[test]
    fn non_number_argument_is_dropped() {
        let (registry, _, timeout) = shooter_registry();
        let def = ComponentDef::Custom {
            name: "TimeOut".to_string(),
            arguments: vec![VarDef {
                name: "time".to_string(),
                number: None,
            }],
        };
        assert_eq!(
            ComponentCreator::from_def(&def, &registry),
            Some(ComponentCreator::Custom {
                component: timeout,
                arguments: CustomArguments::new(),
            })
        );
    }

    #[test]
    fn english_lists() {
        assert_eq!(english_or(&[]), "nothing");
        assert_eq!(english_or(&["a"]), "a");
        assert_eq!(english_or(&["a", "b", "c"]), "a, b or c");
    }
}
