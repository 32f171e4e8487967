//! Global keyboard hook using the Win32 low-level keyboard hook
//!
//! Runs on a dedicated thread that installs the hook, owns the single
//! interceptor instance and pumps the thread's message queue. Every key
//! transition is handed to the interceptor and its verdict is returned to
//! the platform before the callback exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error};

use crate::config::Config;
use crate::events::StateEvent;

/// Identifier of the emergency quit chord (Control+Alt+F12)
pub const QUIT_HOTKEY_ID: i32 = 1;

/// Events sent from the hook thread to the main task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The emergency quit chord was pressed
    QuitRequested,
    /// The hook thread exited
    Stopped,
}

/// Errors that can occur in the hook listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hook listener is already running")]
    AlreadyRunning,

    #[error("failed to install low-level keyboard hook: {0}")]
    HookInstall(String),

    #[error("failed to register emergency quit chord Ctrl+Alt+F12: {0}")]
    QuitChordRegistration(String),

    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),

    #[error("hook thread exited before reporting readiness")]
    ThreadExited,

    #[error("global keyboard hooks are not supported on this platform")]
    UnsupportedPlatform,
}

/// Handle to the running hook thread
struct HookThread {
    thread_id: u32,
    handle: JoinHandle<()>,
}

/// Global keyboard hook that routes every key event through the interceptor
pub struct HookListener {
    config: Config,
    hotkey_tx: mpsc::Sender<HotkeyEvent>,
    event_tx: broadcast::Sender<StateEvent>,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<HookThread>>,
}

impl HookListener {
    /// Create a new hook listener
    pub fn new(
        config: Config,
        hotkey_tx: mpsc::Sender<HotkeyEvent>,
        event_tx: broadcast::Sender<StateEvent>,
    ) -> Self {
        Self {
            config,
            hotkey_tx,
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
    }

    /// Start the hook listener
    ///
    /// Spawns the hook thread and waits until the hook and the emergency
    /// chord are installed there. Any installation failure is returned.
    pub fn start(&self) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let result = self.spawn();
        if result.is_err() {
            self.running.store(false, Ordering::SeqCst);
        }
        result
    }

    #[cfg(windows)]
    fn spawn(&self) -> Result<(), HotkeyError> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let config = self.config.clone();
        let hotkey_tx = self.hotkey_tx.clone();
        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        let handle = std::thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || {
                tracing::info!("hook thread started");

                win32::run_hook_thread(config, &hotkey_tx, event_tx, ready_tx);

                running.store(false, Ordering::SeqCst);
                let _ = hotkey_tx.blocking_send(HotkeyEvent::Stopped);
                tracing::info!("hook thread stopped");
            })
            .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                *self.lock_thread() = Some(HookThread { thread_id, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(HotkeyError::ThreadExited)
            }
        }
    }

    #[cfg(not(windows))]
    fn spawn(&self) -> Result<(), HotkeyError> {
        let _ = (&self.config, &self.hotkey_tx, &self.event_tx);
        Err(HotkeyError::UnsupportedPlatform)
    }

    /// Stop the hook listener and wait for the hook to be removed
    pub fn stop(&self) {
        let Some(hook_thread) = self.lock_thread().take() else {
            return;
        };

        #[cfg(windows)]
        win32::request_quit(hook_thread.thread_id);

        if hook_thread.handle.join().is_err() {
            error!("hook thread panicked");
        }
        self.running.store(false, Ordering::SeqCst);
        debug!(thread_id = hook_thread.thread_id, "hook listener stopped");
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn lock_thread(&self) -> std::sync::MutexGuard<'_, Option<HookThread>> {
        self.thread
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for HookListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(windows)]
mod win32 {
    use std::cell::RefCell;

    use tokio::sync::{broadcast, mpsc};
    use tracing::{debug, info, trace, warn};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        RegisterHotKey, UnregisterHotKey, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT, VK_F12,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
        TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, LLKHF_INJECTED, MSG,
        WH_KEYBOARD_LL, WM_HOTKEY, WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
    };

    use super::{HotkeyError, HotkeyEvent, QUIT_HOTKEY_ID};
    use crate::config::Config;
    use crate::events::StateEvent;
    use crate::hotkey::{KeyCode, KeyTransition, RawKeyEvent};
    use crate::inject::{Emitter, InjectionTag, Win32Injector};
    use crate::state::{Interceptor, Verdict};

    thread_local! {
        /// The interceptor owned by the hook thread; present while the hook is installed
        static INTERCEPTOR: RefCell<Option<Interceptor<Win32Injector>>> = RefCell::new(None);
    }

    /// Hook and quit chord registered by this thread, released on drop
    struct Installed {
        hook: HHOOK,
        hotkey_registered: bool,
    }

    impl Drop for Installed {
        fn drop(&mut self) {
            if self.hotkey_registered {
                if let Err(e) = unsafe { UnregisterHotKey(HWND(0), QUIT_HOTKEY_ID) } {
                    warn!(%e, "failed to unregister quit chord");
                }
            }
            if let Err(e) = unsafe { UnhookWindowsHookEx(self.hook) } {
                warn!(%e, "failed to remove keyboard hook");
            }
            INTERCEPTOR.with(|slot| slot.borrow_mut().take());
            debug!("keyboard hook removed");
        }
    }

    pub(super) fn run_hook_thread(
        config: Config,
        hotkey_tx: &mpsc::Sender<HotkeyEvent>,
        event_tx: broadcast::Sender<StateEvent>,
        ready_tx: std::sync::mpsc::Sender<Result<u32, HotkeyError>>,
    ) {
        let emitter = Emitter::new(Win32Injector::new(), config.fallback_delay);
        let interceptor = Interceptor::new(config.shortcut, emitter, event_tx);
        INTERCEPTOR.with(|slot| *slot.borrow_mut() = Some(interceptor));

        let installed = match install() {
            Ok(installed) => installed,
            Err(e) => {
                INTERCEPTOR.with(|slot| slot.borrow_mut().take());
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        let thread_id = unsafe { GetCurrentThreadId() };
        let _ = ready_tx.send(Ok(thread_id));
        info!(shortcut = %config.shortcut, "keyboard hook installed, press Ctrl+Alt+F12 to quit");

        pump_messages(hotkey_tx);
        drop(installed);
    }

    fn install() -> Result<Installed, HotkeyError> {
        let module = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|e| HotkeyError::HookInstall(e.to_string()))?;

        let hook = unsafe {
            SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), HINSTANCE(module.0), 0)
        }
        .map_err(|e| HotkeyError::HookInstall(e.to_string()))?;

        let mut installed = Installed {
            hook,
            hotkey_registered: false,
        };

        unsafe {
            RegisterHotKey(
                HWND(0),
                QUIT_HOTKEY_ID,
                MOD_CONTROL | MOD_ALT | MOD_NOREPEAT,
                VK_F12.0 as u32,
            )
        }
        .map_err(|e| HotkeyError::QuitChordRegistration(e.to_string()))?;
        installed.hotkey_registered = true;

        Ok(installed)
    }

    fn pump_messages(hotkey_tx: &mpsc::Sender<HotkeyEvent>) {
        let mut msg = MSG::default();
        // GetMessageW returns 0 on WM_QUIT and -1 on error
        while unsafe { GetMessageW(&mut msg, HWND(0), 0, 0) }.0 > 0 {
            if msg.message == WM_HOTKEY && msg.wParam.0 == QUIT_HOTKEY_ID as usize {
                info!("emergency quit chord pressed");
                if hotkey_tx.blocking_send(HotkeyEvent::QuitRequested).is_err() {
                    warn!("failed to send quit request - channel closed?");
                    break;
                }
                continue;
            }
            unsafe {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    pub(super) fn request_quit(thread_id: u32) {
        if let Err(e) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            debug!(%e, "hook thread already gone");
        }
    }

    fn raw_event(wparam: WPARAM, info: &KBDLLHOOKSTRUCT) -> Option<RawKeyEvent> {
        let transition = match wparam.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => KeyTransition::Down,
            WM_KEYUP | WM_SYSKEYUP => KeyTransition::Up,
            _ => return None,
        };

        Some(RawKeyEvent {
            code: KeyCode(info.vkCode as u16),
            transition,
            injected: (info.flags.0 & LLKHF_INJECTED.0) != 0,
            own_tag: InjectionTag::OWN.matches(info.dwExtraInfo),
        })
    }

    /// Low-level keyboard hook callback - must be fast
    unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        if code >= 0 {
            let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);

            if let Some(event) = raw_event(wparam, info) {
                let verdict = INTERCEPTOR.with(|slot| match slot.try_borrow_mut() {
                    Ok(mut slot) => slot.as_mut().map(|interceptor| interceptor.handle(event)),
                    Err(_) => {
                        trace!(key = %event.code, "re-entrant hook delivery, passing through");
                        None
                    }
                });

                if verdict == Some(Verdict::Suppress) {
                    return LRESULT(1);
                }
            }
        }

        CallNextHookEx(HHOOK(0), code, wparam, lparam)
    }

}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn create_listener() -> (HookListener, mpsc::Receiver<HotkeyEvent>) {
        let (hotkey_tx, hotkey_rx) = mpsc::channel(8);
        let (event_tx, _) = broadcast::channel(8);
        let config = Config::load_from(Path::new("/nonexistent/shortcut.json"));
        (HookListener::new(config, hotkey_tx, event_tx), hotkey_rx)
    }

    #[test]
    fn test_listener_creation() {
        let (listener, _rx) = create_listener();
        assert!(!listener.is_running());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let (listener, _rx) = create_listener();
        listener.stop();
        assert!(!listener.is_running());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_start_unsupported_platform() {
        let (listener, _rx) = create_listener();
        assert!(matches!(
            listener.start(),
            Err(HotkeyError::UnsupportedPlatform)
        ));
        assert!(!listener.is_running());
    }
}
