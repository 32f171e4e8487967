//! Signal handling for orderly shutdown

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::hotkey::HotkeyEvent;

/// Why the process is shutting down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Emergency quit chord pressed
    QuitChord,
    /// Hook thread went away
    HookStopped,
    /// Ctrl+C from the console
    Interrupt,
}

/// Waits for the first quit trigger: the emergency chord, the hook thread
/// exiting, or Ctrl+C
pub struct ShutdownSignal {
    hotkey_rx: mpsc::Receiver<HotkeyEvent>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal fed by the hook listener
    pub fn new(hotkey_rx: mpsc::Receiver<HotkeyEvent>) -> Self {
        Self { hotkey_rx }
    }

    /// Wait for a shutdown trigger
    pub async fn wait(&mut self) -> ShutdownReason {
        tokio::select! {
            event = self.hotkey_rx.recv() => match event {
                Some(HotkeyEvent::QuitRequested) => {
                    debug!("received quit chord");
                    ShutdownReason::QuitChord
                }
                Some(HotkeyEvent::Stopped) | None => {
                    debug!("hook thread stopped");
                    ShutdownReason::HookStopped
                }
            },
            _ = interrupt() => {
                debug!("received Ctrl+C");
                ShutdownReason::Interrupt
            }
        }
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(%e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
