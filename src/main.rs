//! winkey-palette: turns a solo Windows-key tap into a configurable shortcut
//!
//! This utility runs in the background and provides:
//! - A low-level keyboard hook that sees every key event system-wide
//! - A state machine that tells a meta tap apart from a meta combo
//! - Tagged input injection that fires the shortcut or restores the combo
//!
//! Combos (Win+E, Win+Arrow, ...) behave exactly as without the utility.
//! Ctrl+Alt+F12 quits.

#![cfg_attr(not(windows), allow(dead_code))]

mod config;
mod events;
mod hotkey;
mod inject;
mod lifecycle;
mod state;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::StateEvent;
use crate::hotkey::HookListener;
use crate::lifecycle::ShutdownSignal;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "winkey-palette starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(
        source = ?config.source,
        shortcut = %config.shortcut,
        "configuration loaded"
    );

    // Hook thread -> main task (quit chord, thread exit)
    let (hotkey_tx, hotkey_rx) = mpsc::channel(8);
    // Interceptor -> observers
    let (event_tx, mut event_rx) = broadcast::channel::<StateEvent>(64);

    let listener = HookListener::new(config, hotkey_tx, event_tx);
    listener
        .start()
        .context("failed to start keyboard interception")?;

    let mut shutdown = ShutdownSignal::new(hotkey_rx);

    tokio::select! {
        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) if event.delivered() => debug!(%event, "state event"),
                    Ok(event) => warn!(%event, "state event with undelivered injection"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "state event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("state event stream closed");
        }

        reason = shutdown.wait() => {
            info!(?reason, "shutdown requested");
        }
    }

    info!("shutting down...");
    listener.stop();
    info!("winkey-palette stopped");

    Ok(())
}
