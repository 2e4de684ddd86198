//! Game and world description files.
//!
//! `game.json` names the key bindings and entity templates; `world.json`
//! lists the objects spawned when the game starts. Components use the
//! externally tagged form `{"position": {"x": 0, "y": 0}}` or
//! `{"custom": {"name": "TimeOut", "arguments": [{"name": "time", "number": 3}]}}`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn load_json<T>(path: &Path) -> Result<T, DataError>
where
    T: for<'de> Deserialize<'de>,
{
    let text = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DataError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameData {
    #[serde(default)]
    pub title: String,
    /// Seed for the random streams scripts create.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub binds: Vec<BindDef>,
    #[serde(default)]
    pub templates: Vec<TemplateDef>,
}

impl GameData {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let game: GameData = load_json(path)?;
        tracing::info!(
            title = %game.title,
            binds = game.binds.len(),
            templates = game.templates.len(),
            "loaded game data"
        );
        Ok(game)
    }
}

/// A named input bound to a key by name; bad key names are reported when bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindDef {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDef {
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentDef {
    Position {
        #[serde(default)]
        x: f32,
        #[serde(default)]
        y: f32,
    },
    Custom {
        name: String,
        #[serde(default)]
        arguments: Vec<VarDef>,
    },
}

/// A template argument. Only numeric arguments are supported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    pub name: String,
    #[serde(default)]
    pub number: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
}

impl WorldData {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let world: WorldData = load_json(path)?;
        tracing::info!(objects = world.objects.len(), "loaded world data");
        Ok(world)
    }
}

/// An object in the world: an optional template plus extra components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectDef {
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_game_data() {
        let game = GameData::from_json(
            r#"{
                "title": "shooter",
                "seed": 42,
                "binds": [{"name": "fire", "key": "space"}],
                "templates": [{
                    "name": "shot",
                    "components": [
                        {"position": {"x": 1, "y": 2}},
                        {"custom": {"name": "TimeOut", "arguments": [{"name": "time", "number": 3}]}}
                    ]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(game.title, "shooter");
        assert_eq!(game.seed, 42);
        assert_eq!(game.binds[0].key, "space");
        let shot = &game.templates[0];
        assert_eq!(shot.components[0], ComponentDef::Position { x: 1.0, y: 2.0 });
        assert_eq!(
            shot.components[1],
            ComponentDef::Custom {
                name: "TimeOut".to_string(),
                arguments: vec![VarDef {
                    name: "time".to_string(),
                    number: Some(3.0)
                }],
            }
        );
    }

    #[test]
    fn non_numeric_argument_parses_without_number() {
        let def: VarDef = serde_json::from_str(r#"{"name": "label", "text": "hi"}"#).unwrap();
        assert_eq!(def.number, None);
    }

    #[test]
    fn load_world_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"objects": [{{"template": "player"}}, {{"components": [{{"position": {{}}}}]}}]}}"#
        )
        .unwrap();
        let world = WorldData::load(file.path()).unwrap();
        assert_eq!(world.objects.len(), 2);
        assert_eq!(world.objects[0].template.as_deref(), Some("player"));
        assert_eq!(world.objects[1].components[0], ComponentDef::Position { x: 0.0, y: 0.0 });
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GameData::load(&dir.path().join("game.json")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
