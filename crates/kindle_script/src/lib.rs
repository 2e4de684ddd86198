//! Kindle Scripting Host
//!
//! Runs gameplay scripts against the world: registry, input and templates.
//!
//! ## Architecture
//!
//! - **Native:** Rust callbacks over [`ScriptEnv`], the world plus the
//!   script's own state
//! - **JavaScript:** QuickJS context exposing `Registry`, `Systems`,
//!   `Templates`, `Input` and `print`
//! - **FFI:** entities cross into scripts as plain numbers (see [`ffi`])

pub mod demo;
pub mod ffi;
pub mod host;
pub mod js;

pub use host::{HostError, NativeHost, ScriptEnv, Simulation, World, WorldSummary};
pub use js::{JsHost, ScriptError};
pub use rquickjs;
