//! Hotkey module for global keyboard event interception
//!
//! Classifies raw key codes and hosts the low-level keyboard hook that
//! feeds every key transition to the interceptor.

mod keys;
mod listener;

pub use keys::{classify, KeyCode, KeyRole, KeyStroke, KeyTransition, ModifierState, RawKeyEvent};
pub use listener::{HookListener, HotkeyError, HotkeyEvent};
