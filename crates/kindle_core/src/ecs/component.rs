// component.rs - Runtime component types
//
// Components are identified by u32 IDs handed out by the owning Registry, not
// Rust TypeIds. Script-defined components (named fields) coexist with the
// built-in Position2 component.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type ComponentId = u32;

/// Name the built-in position component is registered under.
pub const POSITION2_NAME: &str = "Position2";

/// The storage shape of a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    /// Built-in 2D position.
    Position2,
    /// Named fields defined by a script.
    Custom,
}

/// Arguments a template passes to a custom component's initializer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomArguments {
    numbers: BTreeMap<String, f64>,
}

impl CustomArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_number(mut self, name: impl Into<String>, value: f64) -> Self {
        self.numbers.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.numbers.insert(name.into(), value);
    }

    /// Missing names read as zero.
    pub fn number(&self, name: &str) -> f64 {
        self.numbers.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.numbers.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.numbers.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

/// A single field of a custom component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Named fields of a custom component instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields {
    values: BTreeMap<String, FieldValue>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.values.remove(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_number)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_flag)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A component instance as stored by the registry.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentValue {
    Position2(Vec2),
    Custom(Fields),
}

impl ComponentValue {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentValue::Position2(_) => ComponentKind::Position2,
            ComponentValue::Custom(_) => ComponentKind::Custom,
        }
    }

    pub fn as_position2(&self) -> Option<&Vec2> {
        match self {
            ComponentValue::Position2(vec) => Some(vec),
            ComponentValue::Custom(_) => None,
        }
    }

    pub fn as_position2_mut(&mut self) -> Option<&mut Vec2> {
        match self {
            ComponentValue::Position2(vec) => Some(vec),
            ComponentValue::Custom(_) => None,
        }
    }

    pub fn as_fields(&self) -> Option<&Fields> {
        match self {
            ComponentValue::Custom(fields) => Some(fields),
            ComponentValue::Position2(_) => None,
        }
    }

    pub fn as_fields_mut(&mut self) -> Option<&mut Fields> {
        match self {
            ComponentValue::Custom(fields) => Some(fields),
            ComponentValue::Position2(_) => None,
        }
    }
}

/// Native initializer: turns template arguments into the starting fields.
pub type Initializer = Rc<dyn Fn(&CustomArguments) -> Fields>;

/// How fresh instances of a custom component get their fields.
#[derive(Clone, Default)]
pub enum ComponentInit {
    /// Start empty.
    #[default]
    Empty,
    /// Run a Rust closure.
    Native(Initializer),
    /// Start empty and queue the arguments for a script-side initializer.
    Deferred,
}

impl ComponentInit {
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&CustomArguments) -> Fields + 'static,
    {
        ComponentInit::Native(Rc::new(f))
    }
}

impl fmt::Debug for ComponentInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentInit::Empty => f.write_str("Empty"),
            ComponentInit::Native(_) => f.write_str("Native(..)"),
            ComponentInit::Deferred => f.write_str("Deferred"),
        }
    }
}

/// Metadata for a registered component type.
#[derive(Clone, Debug)]
pub struct ComponentType {
    pub id: ComponentId,
    pub name: String,
    pub kind: ComponentKind,
    pub init: ComponentInit,
}
