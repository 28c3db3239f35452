//! Host keyboard to script key names.
//!
//! Scripts ask `frame.input.is_key_pressed("a")`, `("space")`, `("up")`, and
//! so on. Names are lowercase; lookups are case-insensitive.

use std::collections::HashSet;

use winit::keyboard::KeyCode;

/// Script-facing name for a physical key, if it has one.
#[must_use]
pub fn key_name(code: KeyCode) -> Option<&'static str> {
    let name = match code {
        KeyCode::KeyA => "a",
        KeyCode::KeyB => "b",
        KeyCode::KeyC => "c",
        KeyCode::KeyD => "d",
        KeyCode::KeyE => "e",
        KeyCode::KeyF => "f",
        KeyCode::KeyG => "g",
        KeyCode::KeyH => "h",
        KeyCode::KeyI => "i",
        KeyCode::KeyJ => "j",
        KeyCode::KeyK => "k",
        KeyCode::KeyL => "l",
        KeyCode::KeyM => "m",
        KeyCode::KeyN => "n",
        KeyCode::KeyO => "o",
        KeyCode::KeyP => "p",
        KeyCode::KeyQ => "q",
        KeyCode::KeyR => "r",
        KeyCode::KeyS => "s",
        KeyCode::KeyT => "t",
        KeyCode::KeyU => "u",
        KeyCode::KeyV => "v",
        KeyCode::KeyW => "w",
        KeyCode::KeyX => "x",
        KeyCode::KeyY => "y",
        KeyCode::KeyZ => "z",

        KeyCode::Digit0 | KeyCode::Numpad0 => "0",
        KeyCode::Digit1 | KeyCode::Numpad1 => "1",
        KeyCode::Digit2 | KeyCode::Numpad2 => "2",
        KeyCode::Digit3 | KeyCode::Numpad3 => "3",
        KeyCode::Digit4 | KeyCode::Numpad4 => "4",
        KeyCode::Digit5 | KeyCode::Numpad5 => "5",
        KeyCode::Digit6 | KeyCode::Numpad6 => "6",
        KeyCode::Digit7 | KeyCode::Numpad7 => "7",
        KeyCode::Digit8 | KeyCode::Numpad8 => "8",
        KeyCode::Digit9 | KeyCode::Numpad9 => "9",

        KeyCode::ArrowUp => "up",
        KeyCode::ArrowDown => "down",
        KeyCode::ArrowLeft => "left",
        KeyCode::ArrowRight => "right",

        KeyCode::Space => "space",
        KeyCode::Enter | KeyCode::NumpadEnter => "return",
        KeyCode::Tab => "tab",
        KeyCode::Backspace => "backspace",
        KeyCode::ShiftLeft | KeyCode::ShiftRight => "shift",
        KeyCode::ControlLeft | KeyCode::ControlRight => "ctrl",
        KeyCode::AltLeft | KeyCode::AltRight => "alt",
        _ => return None,
    };
    Some(name)
}

/// Physical keys currently held. Several keys can share a name (both
/// shift keys are `"shift"`); the name stays pressed until the last of them
/// is released.
#[derive(Debug, Default)]
pub struct KeyTracker {
    held: HashSet<KeyCode>,
}

impl KeyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition. Returns the script name and its new state, or
    /// `None` for keys without a name.
    pub fn update(&mut self, code: KeyCode, pressed: bool) -> Option<(&'static str, bool)> {
        let name = key_name(code)?;
        if pressed {
            self.held.insert(code);
        } else {
            self.held.remove(&code);
        }
        let down = self.held.iter().any(|&held| key_name(held) == Some(name));
        Some((name, down))
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_keys_have_names() {
        assert_eq!(key_name(KeyCode::KeyQ), Some("q"));
        assert_eq!(key_name(KeyCode::Numpad7), Some("7"));
        assert_eq!(key_name(KeyCode::ArrowLeft), Some("left"));
        assert_eq!(key_name(KeyCode::ShiftRight), Some("shift"));
        assert_eq!(key_name(KeyCode::F12), None);
    }

    #[test]
    fn shared_name_stays_down_until_both_sides_release() {
        let mut keys = KeyTracker::new();
        assert_eq!(keys.update(KeyCode::ShiftLeft, true), Some(("shift", true)));
        assert_eq!(keys.update(KeyCode::ShiftRight, true), Some(("shift", true)));
        assert_eq!(keys.update(KeyCode::ShiftLeft, false), Some(("shift", true)));
        assert_eq!(keys.update(KeyCode::ShiftRight, false), Some(("shift", false)));
    }

    #[test]
    fn digit_row_and_keypad_share_a_name() {
        let mut keys = KeyTracker::new();
        keys.update(KeyCode::Digit7, true);
        assert_eq!(keys.update(KeyCode::Numpad7, true), Some(("7", true)));
        assert_eq!(keys.update(KeyCode::Digit7, false), Some(("7", true)));
        assert_eq!(keys.update(KeyCode::F12, true), None);
        keys.clear();
        assert_eq!(keys.update(KeyCode::Numpad7, false), Some(("7", false)));
    }
}
