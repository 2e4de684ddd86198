//! Kindle Services Layer
//!
//! Platform-facing state the host feeds to scripts: key bindings and their
//! per-frame state, input recordings for replays, and runtime settings.

pub mod input;
pub mod recording;
pub mod settings;

pub use input::{BoundKey, Input, Key, KeyState, DOWN_THRESHOLD};
pub use recording::{InputRecording, RecordedEvent, RecordingError};
pub use settings::{Settings, SettingsError};
