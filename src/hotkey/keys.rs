//! Key code definitions and modifier state tracking
//!
//! Provides the virtual-key constants the interceptor cares about, the
//! classifier that maps a key code to its role, and a struct for tracking
//! which modifiers are currently held.

use serde::{Deserialize, Serialize};

/// Platform virtual-key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const BACKSPACE: KeyCode = KeyCode(0x08);
    pub const TAB: KeyCode = KeyCode(0x09);
    pub const ENTER: KeyCode = KeyCode(0x0D);
    pub const SHIFT: KeyCode = KeyCode(0x10);
    pub const CONTROL: KeyCode = KeyCode(0x11);
    /// Alt
    pub const MENU: KeyCode = KeyCode(0x12);
    pub const CAPS_LOCK: KeyCode = KeyCode(0x14);
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
    pub const SPACE: KeyCode = KeyCode(0x20);
    pub const PAGE_UP: KeyCode = KeyCode(0x21);
    pub const PAGE_DOWN: KeyCode = KeyCode(0x22);
    pub const END: KeyCode = KeyCode(0x23);
    pub const HOME: KeyCode = KeyCode(0x24);
    pub const LEFT: KeyCode = KeyCode(0x25);
    pub const UP: KeyCode = KeyCode(0x26);
    pub const RIGHT: KeyCode = KeyCode(0x27);
    pub const DOWN: KeyCode = KeyCode(0x28);
    pub const INSERT: KeyCode = KeyCode(0x2D);
    pub const DELETE: KeyCode = KeyCode(0x2E);
    pub const LWIN: KeyCode = KeyCode(0x5B);
    pub const RWIN: KeyCode = KeyCode(0x5C);
    pub const F1: KeyCode = KeyCode(0x70);
    pub const F12: KeyCode = KeyCode(0x7B);
    pub const LSHIFT: KeyCode = KeyCode(0xA0);
    pub const RSHIFT: KeyCode = KeyCode(0xA1);
    pub const LCONTROL: KeyCode = KeyCode(0xA2);
    pub const RCONTROL: KeyCode = KeyCode(0xA3);

    /// Resolve a key name from the configuration document.
    ///
    /// Accepts single letters and digits, `F1`-`F24`, hexadecimal codes
    /// (`0x41`) and a fixed set of named keys. Matching ignores case,
    /// spaces, dashes and underscores. Returns `None` for anything else.
    pub fn from_name(name: &str) -> Option<KeyCode> {
        let trimmed = name.trim();

        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            return u16::from_str_radix(hex, 16)
                .ok()
                .filter(|code| (1..=0xFE).contains(code))
                .map(KeyCode);
        }

        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() {
                return Some(KeyCode(c.to_ascii_uppercase() as u16));
            }
            return None;
        }

        let normalized: String = trimmed
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if let Some(n) = normalized
            .strip_prefix('f')
            .and_then(|digits| digits.parse::<u16>().ok())
        {
            return (1..=24).contains(&n).then(|| KeyCode(Self::F1.0 + n - 1));
        }

        let code = match normalized.as_str() {
            "space" | "spacebar" => Self::SPACE,
            "escape" | "esc" => Self::ESCAPE,
            "tab" => Self::TAB,
            "enter" | "return" => Self::ENTER,
            "backspace" | "back" => Self::BACKSPACE,
            "insert" | "ins" => Self::INSERT,
            "delete" | "del" => Self::DELETE,
            "home" => Self::HOME,
            "end" => Self::END,
            "pageup" | "pgup" | "prior" => Self::PAGE_UP,
            "pagedown" | "pgdn" | "next" => Self::PAGE_DOWN,
            "left" | "arrowleft" | "leftarrow" => Self::LEFT,
            "right" | "arrowright" | "rightarrow" => Self::RIGHT,
            "up" | "arrowup" | "uparrow" => Self::UP,
            "down" | "arrowdown" | "downarrow" => Self::DOWN,
            "capslock" | "capital" => Self::CAPS_LOCK,
            _ => return None,
        };
        Some(code)
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.0)
    }
}

/// Direction of a key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTransition {
    Down,
    Up,
}

impl KeyTransition {
    pub fn is_down(self) -> bool {
        self == KeyTransition::Down
    }
}

/// A single key action, as buffered or injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub code: KeyCode,
    pub transition: KeyTransition,
}

impl KeyStroke {
    pub fn down(code: KeyCode) -> Self {
        Self {
            code,
            transition: KeyTransition::Down,
        }
    }

    pub fn up(code: KeyCode) -> Self {
        Self {
            code,
            transition: KeyTransition::Up,
        }
    }
}

/// A keyboard event as delivered by the platform hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub code: KeyCode,
    pub transition: KeyTransition,
    /// The platform flagged the event as injected by some process
    pub injected: bool,
    /// The event carries this process's injection tag
    pub own_tag: bool,
}

impl RawKeyEvent {
    /// A genuine physical key event
    pub fn physical(code: KeyCode, transition: KeyTransition) -> Self {
        Self {
            code,
            transition,
            injected: false,
            own_tag: false,
        }
    }

    pub fn stroke(&self) -> KeyStroke {
        KeyStroke {
            code: self.code,
            transition: self.transition,
        }
    }
}

/// Semantic role of a key for the interceptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Meta,
    Control,
    Shift,
    Other,
}

/// Classify a key code. Unknown codes are `Other`.
pub fn classify(code: KeyCode) -> KeyRole {
    match code {
        KeyCode::LWIN | KeyCode::RWIN => KeyRole::Meta,
        KeyCode::CONTROL | KeyCode::LCONTROL | KeyCode::RCONTROL => KeyRole::Control,
        KeyCode::SHIFT | KeyCode::LSHIFT | KeyCode::RSHIFT => KeyRole::Shift,
        _ => KeyRole::Other,
    }
}

/// Tracks which modifier keys are held and whether the current meta
/// session has been promoted to passthrough
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Meta key is held
    pub meta: bool,
    /// Control key is held
    pub control: bool,
    /// Shift key is held
    pub shift: bool,
    /// The meta session is forwarding events to the platform
    pub passthrough: bool,
}

impl ModifierState {
    /// Check if all flags are clear
    pub fn is_empty(&self) -> bool {
        !self.meta && !self.control && !self.shift && !self.passthrough
    }

    /// Control+Escape fires the shortcut only without Shift
    pub fn is_control_without_shift(&self) -> bool {
        self.control && !self.shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_modifiers() {
        assert_eq!(classify(KeyCode::LWIN), KeyRole::Meta);
        assert_eq!(classify(KeyCode::RWIN), KeyRole::Meta);
        assert_eq!(classify(KeyCode::LCONTROL), KeyRole::Control);
        assert_eq!(classify(KeyCode::CONTROL), KeyRole::Control);
        assert_eq!(classify(KeyCode::RSHIFT), KeyRole::Shift);
    }

    #[test]
    fn test_classify_unknown_is_other() {
        assert_eq!(classify(KeyCode::MENU), KeyRole::Other);
        assert_eq!(classify(KeyCode(0x41)), KeyRole::Other);
        assert_eq!(classify(KeyCode(0xFF)), KeyRole::Other);
    }

    #[test]
    fn test_letters_and_digits() {
        assert_eq!(KeyCode::from_name("p"), Some(KeyCode(0x50)));
        assert_eq!(KeyCode::from_name("P"), Some(KeyCode(0x50)));
        assert_eq!(KeyCode::from_name("7"), Some(KeyCode(0x37)));
        assert_eq!(KeyCode::from_name("/"), None);
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(KeyCode::from_name("F1"), Some(KeyCode::F1));
        assert_eq!(KeyCode::from_name("f12"), Some(KeyCode::F12));
        assert_eq!(KeyCode::from_name("F24"), Some(KeyCode(0x87)));
        assert_eq!(KeyCode::from_name("F25"), None);
        assert_eq!(KeyCode::from_name("F0"), None);
    }

    #[test]
    fn test_hex_codes() {
        assert_eq!(KeyCode::from_name("0x20"), Some(KeyCode::SPACE));
        assert_eq!(KeyCode::from_name("0XBA"), Some(KeyCode(0xBA)));
        assert_eq!(KeyCode::from_name("0x"), None);
        assert_eq!(KeyCode::from_name("0x1FF"), None);
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(KeyCode::from_name("Space"), Some(KeyCode::SPACE));
        assert_eq!(KeyCode::from_name("esc"), Some(KeyCode::ESCAPE));
        assert_eq!(KeyCode::from_name("Page Up"), Some(KeyCode::PAGE_UP));
        assert_eq!(KeyCode::from_name("page_down"), Some(KeyCode::PAGE_DOWN));
        assert_eq!(KeyCode::from_name("ArrowLeft"), Some(KeyCode::LEFT));
        assert_eq!(KeyCode::from_name("Caps Lock"), Some(KeyCode::CAPS_LOCK));
        assert_eq!(KeyCode::from_name("hyper"), None);
    }

    #[test]
    fn test_empty_state() {
        let state = ModifierState::default();
        assert!(state.is_empty());
        assert!(!state.is_control_without_shift());
    }

    #[test]
    fn test_control_without_shift() {
        let state = ModifierState {
            control: true,
            ..Default::default()
        };
        assert!(state.is_control_without_shift());

        let state = ModifierState {
            control: true,
            shift: true,
            ..Default::default()
        };
        assert!(!state.is_control_without_shift());
    }
}
