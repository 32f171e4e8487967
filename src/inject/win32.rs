//! Win32 input injection
//!
//! `SendInput` is the batch facility; `keybd_event` is the legacy
//! single-event facility used on the fallback path.

use std::mem::size_of;

use tracing::debug;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    keybd_event, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, VIRTUAL_KEY,
};

use super::emitter::{InputSink, SyntheticKey};
use crate::hotkey::KeyTransition;

/// Injects keyboard input into the desktop session
#[derive(Debug, Default)]
pub struct Win32Injector;

impl Win32Injector {
    pub fn new() -> Self {
        Self
    }
}

fn event_flags(transition: KeyTransition) -> KEYBD_EVENT_FLAGS {
    match transition {
        KeyTransition::Down => KEYBD_EVENT_FLAGS(0),
        KeyTransition::Up => KEYEVENTF_KEYUP,
    }
}

fn to_input(key: &SyntheticKey) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(key.stroke.code.0),
                wScan: 0,
                dwFlags: event_flags(key.stroke.transition),
                time: 0,
                dwExtraInfo: key.tag.value(),
            },
        },
    }
}

impl InputSink for Win32Injector {
    fn send_batch(&mut self, keys: &[SyntheticKey]) -> usize {
        let inputs: Vec<INPUT> = keys.iter().map(to_input).collect();
        let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) } as usize;

        if sent < inputs.len() {
            // Zero delivery with no error code usually means UIPI blocked us
            let err = windows::core::Error::from_win32();
            debug!(sent, expected = inputs.len(), %err, "SendInput rejected events");
        }

        sent
    }

    fn send_one(&mut self, key: SyntheticKey) -> bool {
        let Ok(vk) = u8::try_from(key.stroke.code.0) else {
            return false;
        };
        // keybd_event reports nothing back
        unsafe {
            keybd_event(vk, 0, event_flags(key.stroke.transition), key.tag.value());
        }
        true
    }
}
