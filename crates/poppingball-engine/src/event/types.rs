use std::fmt;

use crate::coords::SurfaceSize;

/// Keyboard key identifier.
///
/// Only the keys the engine and its demo react to are named; everything else
/// maps to `Key::Unknown` with a stable platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    /// `+` on the main row (the `=` key) or the keypad.
    Plus,
    /// `-` on the main row or the keypad.
    Minus,

    /// Platform-dependent key not represented here.
    Unknown(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Modifier keys state.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Events the window host hands to the renderer and the application.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Client area changed, in physical pixels. Zero while minimized.
    Resized(SurfaceSize),

    ScaleFactorChanged(f64),

    CloseRequested,

    Focused(bool),

    ModifiersChanged(Modifiers),

    Key {
        key: Key,
        state: KeyState,
        modifiers: Modifiers,
        /// True when the event is a key-repeat.
        repeat: bool,
    },

    /// Pointer position in logical pixels.
    PointerMoved { x: f32, y: f32 },

    PointerButton {
        button: MouseButton,
        state: KeyState,
    },

    /// Pointer left the window surface.
    PointerLeft,
}

impl HostEvent {
    /// True for a fresh (non-repeat) press of `key`.
    pub fn is_key_press(&self, key: Key) -> bool {
        matches!(
            self,
            HostEvent::Key { key: k, state: KeyState::Pressed, repeat: false, .. } if *k == key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState, repeat: bool) -> HostEvent {
        HostEvent::Key {
            key,
            state,
            modifiers: Modifiers::default(),
            repeat,
        }
    }

    #[test]
    fn key_press_ignores_repeats_and_releases() {
        assert!(key(Key::Plus, KeyState::Pressed, false).is_key_press(Key::Plus));
        assert!(!key(Key::Plus, KeyState::Pressed, true).is_key_press(Key::Plus));
        assert!(!key(Key::Plus, KeyState::Released, false).is_key_press(Key::Plus));
        assert!(!key(Key::Minus, KeyState::Pressed, false).is_key_press(Key::Plus));
    }
}
