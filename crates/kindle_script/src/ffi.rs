//! FFI layer between Rust and scripts
//!
//! Entities cross into JavaScript as numbers holding `Entity::to_bits`.
//! Numbers are doubles on the script side, so only handles that fit in the
//! 53-bit integer range survive the trip; anything else is rejected.

use kindle_core::ecs::Entity;

/// Largest integer a double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Opaque handle for script access
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScriptHandle(pub u64);

impl ScriptHandle {
    pub fn to_number(self) -> f64 {
        self.0 as f64
    }

    /// Parse a script number back into a handle.
    pub fn from_number(value: f64) -> Option<ScriptHandle> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > MAX_SAFE_INTEGER {
            return None;
        }
        Some(ScriptHandle(value as u64))
    }
}

impl From<Entity> for ScriptHandle {
    fn from(entity: Entity) -> Self {
        ScriptHandle(entity.to_bits())
    }
}

impl From<ScriptHandle> for Entity {
    fn from(handle: ScriptHandle) -> Self {
        Entity::from_bits(handle.0)
    }
}

/// Script number for an entity.
pub fn entity_to_number(entity: Entity) -> f64 {
    ScriptHandle::from(entity).to_number()
}

/// Entity for a script number, if the number is a valid handle.
pub fn entity_from_number(value: f64) -> Option<Entity> {
    ScriptHandle::from_number(value).map(Entity::from)
}
