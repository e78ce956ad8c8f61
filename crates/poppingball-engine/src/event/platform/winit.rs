use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

use crate::coords::SurfaceSize;
use crate::event::{HostEvent, Key, KeyState, Modifiers, MouseButton};

/// Translates a winit `WindowEvent` into a `HostEvent`.
///
/// `modifiers` is the last state seen through `ModifiersChanged`; winit 0.30
/// does not report it on key events. Returns `None` for events the engine does
/// not represent (including `RedrawRequested`, which the runtime handles).
pub fn translate_window_event(
    scale_factor: f64,
    modifiers: Modifiers,
    event: &WindowEvent,
) -> Option<HostEvent> {
    match event {
        WindowEvent::Resized(size) => Some(HostEvent::Resized(SurfaceSize::from(*size))),

        WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
            Some(HostEvent::ScaleFactorChanged(*scale_factor))
        }

        WindowEvent::CloseRequested => Some(HostEvent::CloseRequested),

        WindowEvent::Focused(f) => Some(HostEvent::Focused(*f)),

        WindowEvent::ModifiersChanged(m) => Some(HostEvent::ModifiersChanged(map_modifiers(m.state()))),

        WindowEvent::CursorLeft { .. } => Some(HostEvent::PointerLeft),

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = to_logical_f32(scale_factor, *position);
            Some(HostEvent::PointerMoved { x, y })
        }

        WindowEvent::MouseInput { state, button, .. } => Some(HostEvent::PointerButton {
            button: map_mouse_button(*button),
            state: map_state(*state),
        }),

        WindowEvent::KeyboardInput { event, .. } => Some(HostEvent::Key {
            key: map_key(event.physical_key),
            state: map_state(event.state),
            modifiers,
            repeat: event.repeat,
        }),

        _ => None,
    }
}

fn to_logical_f32(scale_factor: f64, pos: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = pos.to_logical::<f64>(scale_factor);
    (logical.x as f32, logical.y as f32)
}

fn map_state(state: ElementState) -> KeyState {
    match state {
        ElementState::Pressed => KeyState::Pressed,
        ElementState::Released => KeyState::Released,
    }
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Other(3),
        WinitMouseButton::Forward => MouseButton::Other(4),
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

pub(crate) fn map_key(pk: PhysicalKey) -> Key {
    match pk {
        PhysicalKey::Code(code) => match code {
            KeyCode::Escape => Key::Escape,
            KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
            KeyCode::Tab => Key::Tab,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Space => Key::Space,

            KeyCode::ArrowUp => Key::ArrowUp,
            KeyCode::ArrowDown => Key::ArrowDown,
            KeyCode::ArrowLeft => Key::ArrowLeft,
            KeyCode::ArrowRight => Key::ArrowRight,

            KeyCode::Equal | KeyCode::NumpadAdd => Key::Plus,
            KeyCode::Minus | KeyCode::NumpadSubtract => Key::Minus,

            other => Key::Unknown(other as u32),
        },

        // winit 0.30 uses NativeKeyCode; no stable numeric is guaranteed here.
        PhysicalKey::Unidentified(_) => Key::Unknown(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_and_minus_cover_both_rows() {
        for code in [KeyCode::Equal, KeyCode::NumpadAdd] {
            assert_eq!(map_key(PhysicalKey::Code(code)), Key::Plus);
        }
        for code in [KeyCode::Minus, KeyCode::NumpadSubtract] {
            assert_eq!(map_key(PhysicalKey::Code(code)), Key::Minus);
        }
    }

    #[test]
    fn unnamed_keys_keep_a_code() {
        assert!(matches!(
            map_key(PhysicalKey::Code(KeyCode::KeyQ)),
            Key::Unknown(_)
        ));
    }

    #[test]
    fn resize_becomes_host_event() {
        let event = WindowEvent::Resized(winit::dpi::PhysicalSize::new(800, 600));
        assert_eq!(
            translate_window_event(1.0, Modifiers::default(), &event),
            Some(HostEvent::Resized(SurfaceSize::new(800, 600)))
        );
    }
}
