//! Input recording and replay
//!
//! A recording is a list of key state changes stamped with the frame they
//! apply to. The headless runtime replays them in place of a window.

use crate::input::{Input, Key};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("failed to access recording {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid recording {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One key change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub frame: u64,
    pub key: Key,
    pub state: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecording {
    events: Vec<RecordedEvent>,
}

impl InputRecording {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut recording: InputRecording = serde_json::from_str(text)?;
        recording.events.sort_by_key(|e| e.frame);
        Ok(recording)
    }

    pub fn load(path: &Path) -> Result<Self, RecordingError> {
        let text = fs::read_to_string(path).map_err(|source| RecordingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let recording = Self::from_json(&text).map_err(|source| RecordingError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), events = recording.len(), "loaded input recording");
        Ok(recording)
    }

    pub fn save(&self, path: &Path) -> Result<(), RecordingError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| RecordingError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, text).map_err(|source| RecordingError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Append an event; events must be recorded in frame order.
    pub fn record(&mut self, frame: u64, key: Key, state: f32) {
        debug_assert!(self.events.last().map_or(true, |e| e.frame <= frame));
        self.events.push(RecordedEvent { frame, key, state });
    }

    pub fn events_for(&self, frame: u64) -> impl Iterator<Item = &RecordedEvent> {
        let start = self.events.partition_point(|e| e.frame < frame);
        self.events[start..].iter().take_while(move |e| e.frame == frame)
    }

    /// Apply this frame's events to the input state. Returns how many applied.
    pub fn apply(&self, frame: u64, input: &mut Input) -> usize {
        let mut applied = 0;
        for event in self.events_for(frame) {
            input.set_key_state(event.key, event.state);
            applied += 1;
        }
        applied
    }

    /// Frame of the final event, if any.
    pub fn last_frame(&self) -> Option<u64> {
        self.events.last().map(|e| e.frame)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
