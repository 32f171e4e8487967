//! Configuration loading and management
//!
//! The shortcut fired on a solo meta tap is read once at startup from a
//! JSON document. Problems with the document are never fatal: they are
//! logged and the built-in default chord is used instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::hotkey::KeyCode;
use crate::inject::DEFAULT_FALLBACK_DELAY;

/// Environment variable that overrides the configuration path
pub const CONFIG_ENV_VAR: &str = "WINKEY_PALETTE_CONFIG";

/// File name looked up next to the executable
pub const CONFIG_FILE_NAME: &str = "shortcut.json";

/// Longest accepted pause between fallback events; the hook thread sleeps through it
pub const MAX_FALLBACK_DELAY_MS: u64 = 9;

/// The chord to synthesize on a solo meta tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutSpec {
    pub meta: bool,
    pub control: bool,
    pub alt: bool,
    pub shift: bool,
    pub main_key: KeyCode,
}

impl Default for ShortcutSpec {
    /// Meta+Alt+Space, the command palette's own binding
    fn default() -> Self {
        Self {
            meta: true,
            control: false,
            alt: true,
            shift: false,
            main_key: KeyCode::SPACE,
        }
    }
}

impl std::fmt::Display for ShortcutSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (held, name) in [
            (self.meta, "Meta+"),
            (self.control, "Ctrl+"),
            (self.alt, "Alt+"),
            (self.shift, "Shift+"),
        ] {
            if held {
                f.write_str(name)?;
            }
        }
        write!(f, "{}", self.main_key)
    }
}

/// On-disk shape of the configuration document
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortcutDocument {
    #[serde(default)]
    meta: bool,
    #[serde(default)]
    control: bool,
    #[serde(default)]
    alt: bool,
    #[serde(default)]
    shift: bool,
    #[serde(default = "default_main_key")]
    main_key: String,
    #[serde(default)]
    fallback_delay_ms: Option<u64>,
}

fn fallback_delay(ms: u64) -> Duration {
    if ms > MAX_FALLBACK_DELAY_MS {
        warn!(
            requested_ms = ms,
            max_ms = MAX_FALLBACK_DELAY_MS,
            "fallback delay too long, clamping"
        );
        return Duration::from_millis(MAX_FALLBACK_DELAY_MS);
    }
    Duration::from_millis(ms)
}

fn default_main_key() -> String {
    "Space".to_string()
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chord fired on a solo meta tap and on Control+Escape
    pub shortcut: ShortcutSpec,

    /// Pause between events when injection falls back to one-at-a-time
    pub fallback_delay: Duration,

    /// Where the document was looked up
    pub source: PathBuf,
}

impl Config {
    /// Load configuration from the environment override or the file next
    /// to the executable
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => PathBuf::from(path),
            None => std::env::current_exe()
                .context("failed to locate executable")?
                .with_file_name(CONFIG_FILE_NAME),
        };
        Ok(Self::load_from(&path))
    }

    /// Load configuration from a specific path, defaulting on any problem
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(?path, "no configuration file, using default shortcut");
                return Self::with_defaults(path);
            }
            Err(e) => {
                warn!(?path, error = %e, "unreadable configuration, using default shortcut");
                return Self::with_defaults(path);
            }
        };

        match Self::parse(&text, path) {
            Ok(config) => config,
            Err(e) => {
                warn!(?path, error = %e, "malformed configuration, using default shortcut");
                Self::with_defaults(path)
            }
        }
    }

    /// Parse a configuration document
    pub fn parse(text: &str, source: &Path) -> Result<Self> {
        let document: ShortcutDocument =
            serde_json::from_str(text).context("invalid shortcut document")?;

        let main_key = KeyCode::from_name(&document.main_key).unwrap_or_else(|| {
            warn!(
                main_key = %document.main_key,
                "unrecognized main key, falling back to Space"
            );
            KeyCode::SPACE
        });

        Ok(Self {
            shortcut: ShortcutSpec {
                meta: document.meta,
                control: document.control,
                alt: document.alt,
                shift: document.shift,
                main_key,
            },
            fallback_delay: document
                .fallback_delay_ms
                .map(fallback_delay)
                .unwrap_or(DEFAULT_FALLBACK_DELAY),
            source: source.to_owned(),
        })
    }

    fn with_defaults(source: &Path) -> Self {
        Self {
            shortcut: ShortcutSpec::default(),
            fallback_delay: DEFAULT_FALLBACK_DELAY,
            source: source.to_owned(),
        }
    }
}
