//! Kindle Core
//!
//! Contains the fundamental simulation pieces scripts are written against:
//! - Entity/component registry with runtime-registered component types
//! - Per-frame system scheduler (update and init callbacks)
//! - Simulation time and interval timers
//! - Math re-exports and seeded random streams

pub mod ecs;
pub mod math;
pub mod time;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
