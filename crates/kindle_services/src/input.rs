//! Input bindings and per-frame key state
//!
//! Scripts see named bindings (`up`, `fire`, ...) rather than physical keys.
//! Each binding carries the current `state` and the previous frame's
//! `last_state`, both in [0, 1].

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A key counts as held once its state rises above this value.
pub const DOWN_THRESHOLD: f32 = 0.1;

macro_rules! define_keys {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Physical keys a binding can be attached to.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Key {
            $($variant,)+
        }

        impl Key {
            pub const ALL: &'static [Key] = &[$(Key::$variant,)+];

            pub fn name(self) -> &'static str {
                match self {
                    $(Key::$variant => $name,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Key> {
                let lower = name.to_ascii_lowercase();
                match lower.as_str() {
                    $($name => Some(Key::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

define_keys! {
    Unbound => "unbound",
    Up => "up",
    Down => "down",
    Left => "left",
    Right => "right",
    Space => "space",
    Return => "return",
    Escape => "escape",
    Tab => "tab",
    Backspace => "backspace",
    LeftShift => "lshift",
    RightShift => "rshift",
    LeftCtrl => "lctrl",
    RightCtrl => "rctrl",
    LeftAlt => "lalt",
    RightAlt => "ralt",
    A => "a", B => "b", C => "c", D => "d", E => "e", F => "f", G => "g",
    H => "h", I => "i", J => "j", K => "k", L => "l", M => "m", N => "n",
    O => "o", P => "p", Q => "q", R => "r", S => "s", T => "t", U => "u",
    V => "v", W => "w", X => "x", Y => "y", Z => "z",
    Num0 => "0", Num1 => "1", Num2 => "2", Num3 => "3", Num4 => "4",
    Num5 => "5", Num6 => "6", Num7 => "7", Num8 => "8", Num9 => "9",
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Key::from_name(&name).ok_or_else(|| de::Error::custom(format!("unknown key '{name}'")))
    }
}

/// Current and previous-frame value of one binding.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeyState {
    pub state: f32,
    pub last_state: f32,
}

impl KeyState {
    pub fn is_down(&self) -> bool {
        self.state > DOWN_THRESHOLD
    }

    pub fn was_down(&self) -> bool {
        self.last_state > DOWN_THRESHOLD
    }

    pub fn just_pressed(&self) -> bool {
        self.is_down() && !self.was_down()
    }

    pub fn just_released(&self) -> bool {
        !self.is_down() && self.was_down()
    }
}

/// A named binding and its state.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundKey {
    pub name: String,
    pub key: Key,
    pub state: KeyState,
}

/// All bindings of a game.
#[derive(Debug, Default, Clone)]
pub struct Input {
    binds: Vec<BoundKey>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, key: Key) {
        self.binds.push(BoundKey {
            name: name.into(),
            key,
            state: KeyState::default(),
        });
    }

    /// Bind by key name. Unknown names are logged and bound to `Key::Unbound`.
    pub fn add_named(&mut self, name: impl Into<String>, key_name: &str) -> Key {
        let key = Key::from_name(key_name).unwrap_or_else(|| {
            tracing::error!(key = key_name, "Invalid key");
            Key::Unbound
        });
        self.add(name, key);
        key
    }

    /// Set the state of every binding attached to `key`.
    pub fn set_key_state(&mut self, key: Key, state: f32) {
        if key == Key::Unbound {
            return;
        }
        let state = state.clamp(0.0, 1.0);
        for bind in self.binds.iter_mut().filter(|b| b.key == key) {
            bind.state.state = state;
        }
    }

    /// Roll the frame over: the current state becomes `last_state`.
    pub fn advance_frame(&mut self) {
        for bind in &mut self.binds {
            bind.state.last_state = bind.state.state;
        }
    }

    pub fn get(&self, name: &str) -> Option<&KeyState> {
        self.binds.iter().find(|b| b.name == name).map(|b| &b.state)
    }

    /// State of a binding; unbound names read as released.
    pub fn state(&self, name: &str) -> KeyState {
        self.get(name).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundKey> {
        self.binds.iter()
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(state: f32, last_state: f32) -> KeyState {
        KeyState { state, last_state }
    }

    #[test]
    fn down_means_above_threshold() {
        assert!(!key(0.1, 0.0).is_down());
        assert!(key(0.11, 0.0).is_down());
        assert!(key(1.0, 0.0).is_down());
    }

    #[test]
    fn just_pressed_uses_last_state() {
        assert!(key(1.0, 0.0).just_pressed());
        assert!(!key(1.0, 1.0).just_pressed());
        assert!(!key(0.0, 0.0).just_pressed());
        assert!(key(0.0, 1.0).just_released());
    }

    #[test]
    fn key_names_roundtrip() {
        for &k in Key::ALL {
            assert_eq!(Key::from_name(k.name()), Some(k));
        }
        assert_eq!(Key::from_name("SPACE"), Some(Key::Space));
        assert_eq!(Key::from_name("joystick"), None);
    }

    #[test]
    fn frame_rollover() {
        let mut input = Input::new();
        input.add("fire", Key::Space);
        input.add("jump", Key::Space);
        input.add("up", Key::Up);

        input.set_key_state(Key::Space, 1.0);
        assert!(input.state("fire").just_pressed());
        assert!(input.state("jump").just_pressed());
        assert!(!input.state("up").is_down());

        input.advance_frame();
        assert!(input.state("fire").is_down());
        assert!(!input.state("fire").just_pressed());

        input.set_key_state(Key::Space, 0.0);
        assert!(input.state("fire").just_released());
    }

    #[test]
    fn invalid_key_name_binds_unbound() {
        let mut input = Input::new();
        assert_eq!(input.add_named("fire", "trigger"), Key::Unbound);
        input.set_key_state(Key::Unbound, 1.0);
        assert!(!input.state("fire").is_down());
        assert_eq!(input.state("missing"), KeyState::default());
    }

    #[test]
    fn state_is_clamped() {
        let mut input = Input::new();
        input.add("up", Key::W);
        input.set_key_state(Key::W, 4.0);
        assert_eq!(input.state("up").state, 1.0);
    }
}
