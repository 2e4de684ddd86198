//! Kindle Asset Pipeline
//!
//! Game and world description files, and the object templates built from them.

pub mod data;
pub mod template;
pub mod world;

pub use data::{
    BindDef, ComponentDef, DataError, GameData, ObjectDef, TemplateDef, VarDef, WorldData,
};
pub use template::{ComponentCreator, ObjectTemplate, TemplateError, Templates};
pub use world::spawn_world;
