//! Production key injection backed by the `enigo` crate.
//!
//! A new [`Enigo`] instance is created for each call because `Enigo` is not
//! `Send` and the handle is cheap to construct — this keeps [`EnigoEmitter`]
//! itself `Send + Sync` so it can live behind an `Arc<dyn KeyEmitter>`.

use enigo::{Direction, Enigo, Keyboard, Settings};

use super::{EmitterError, KeyEmitter};
use crate::key::KeyIdentity;

// ---------------------------------------------------------------------------
// Key mapping
// ---------------------------------------------------------------------------

/// Map a [`KeyIdentity`] onto the `enigo` key space.
///
/// Side variants collapse onto the base enigo key — enigo does not
/// distinguish left/right modifiers portably, and for synthetic output the
/// distinction does not matter.
fn to_enigo_key(id: &KeyIdentity) -> Result<enigo::Key, EmitterError> {
    use enigo::Key;

    let key = match id {
        KeyIdentity::Character(c) => Key::Unicode(*c),
        KeyIdentity::Named(name) => match *name {
            "shift" | "shift_l" | "shift_r" => Key::Shift,
            "ctrl" | "ctrl_l" | "ctrl_r" => Key::Control,
            "alt" | "alt_l" | "alt_r" => Key::Alt,
            "space" => Key::Space,
            "enter" => Key::Return,
            "tab" => Key::Tab,
            "esc" => Key::Escape,
            "backspace" => Key::Backspace,
            "caps_lock" => Key::CapsLock,
            "delete" => Key::Delete,
            "home" => Key::Home,
            "end" => Key::End,
            "page_up" => Key::PageUp,
            "page_down" => Key::PageDown,
            "up" => Key::UpArrow,
            "down" => Key::DownArrow,
            "left" => Key::LeftArrow,
            "right" => Key::RightArrow,
            "f1" => Key::F1,
            "f2" => Key::F2,
            "f3" => Key::F3,
            "f4" => Key::F4,
            "f5" => Key::F5,
            "f6" => Key::F6,
            "f7" => Key::F7,
            "f8" => Key::F8,
            "f9" => Key::F9,
            "f10" => Key::F10,
            "f11" => Key::F11,
            "f12" => Key::F12,
            other => return Err(EmitterError::UnsupportedKey(other.to_string())),
        },
    };

    Ok(key)
}

// ---------------------------------------------------------------------------
// EnigoEmitter
// ---------------------------------------------------------------------------

/// Production [`KeyEmitter`] that injects events via `enigo`.
#[derive(Debug, Clone, Default)]
pub struct EnigoEmitter;

impl EnigoEmitter {
    pub fn new() -> Self {
        Self
    }

    fn send(&self, key: &KeyIdentity, direction: Direction) -> Result<(), EmitterError> {
        let mapped = to_enigo_key(key)?;

        let mut enigo =
            Enigo::new(&Settings::default()).map_err(|e| EmitterError::Backend(e.to_string()))?;

        enigo
            .key(mapped, direction)
            .map_err(|e| EmitterError::Injection(e.to_string()))
    }
}

impl KeyEmitter for EnigoEmitter {
    fn press(&self, key: &KeyIdentity) -> Result<(), EmitterError> {
        self.send(key, Direction::Press)
    }

    fn release(&self, key: &KeyIdentity) -> Result<(), EmitterError> {
        self.send(key, Direction::Release)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
