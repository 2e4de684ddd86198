//! Entity Component System core types.
//!
//! Component types are registered at runtime by name so script-defined
//! components coexist with the built-in `Position2`. Every registry owns its
//! own type table; nothing here is global.

mod component;
mod entity;
mod registry;
mod storage;
mod system_handle;
mod system_registration_error;
mod systems;

pub use component::{
    ComponentId, ComponentInit, ComponentKind, ComponentType, ComponentValue, CustomArguments,
    FieldValue, Fields, Initializer, POSITION2_NAME,
};
pub use entity::Entity;
pub use registry::{PendingInit, Registry, RegistryError};
pub use storage::ComponentList;
pub use system_handle::SystemHandle;
pub use system_registration_error::SystemRegistrationError;
pub use systems::{
    InitFn, SystemContext, SystemError, SystemFailure, SystemPhase, Systems, TickStats, UpdateFn,
};
