//! Events module for interception outcomes
//!
//! The interceptor publishes one event per session outcome so the rest of
//! the process can observe what happened without touching hook state.

use serde::{Deserialize, Serialize};

use crate::hotkey::KeyCode;

/// What caused the shortcut chord to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordTrigger {
    /// Meta pressed and released on its own
    MetaTap,
    /// Control+Escape secondary trigger
    ControlEscape,
}

/// Events emitted by the interceptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// The configured chord was injected
    ChordFired {
        trigger: ChordTrigger,
        /// Whether the platform accepted every event
        delivered: bool,
    },

    /// A second key arrived while meta was held
    PassthroughEntered {
        /// Key that promoted the session
        key: KeyCode,
    },

    /// Meta released after a passthrough session
    PassthroughExited {
        /// Duration in milliseconds that passthrough was active
        duration_ms: u64,
        delivered: bool,
    },

    /// Key-ups held back during an ambiguous session, handed to the platform
    BufferReplayed { events: usize, delivered: bool },
}

impl StateEvent {
    /// Whether the injection behind this event reached the platform
    pub fn delivered(&self) -> bool {
        match self {
            StateEvent::ChordFired { delivered, .. }
            | StateEvent::PassthroughExited { delivered, .. }
            | StateEvent::BufferReplayed { delivered, .. } => *delivered,
            StateEvent::PassthroughEntered { .. } => true,
        }
    }
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::ChordFired { trigger, .. } => write!(f, "CHORD_FIRED ({:?})", trigger),
            StateEvent::PassthroughEntered { key } => write!(f, "PASSTHROUGH_ENTERED ({})", key),
            StateEvent::PassthroughExited { duration_ms, .. } => {
                write!(f, "PASSTHROUGH_EXITED ({}ms)", duration_ms)
            }
            StateEvent::BufferReplayed { events, .. } => {
                write!(f, "BUFFER_REPLAYED ({} events)", events)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = StateEvent::ChordFired {
            trigger: ChordTrigger::MetaTap,
            delivered: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("chord_fired"));
        assert!(json.contains("meta_tap"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"passthrough_entered","key":65}"#;
        let event: StateEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, StateEvent::PassthroughEntered { key: KeyCode(0x41) });
    }

    #[test]
    fn test_delivered() {
        let event = StateEvent::BufferReplayed {
            events: 2,
            delivered: false,
        };
        assert!(!event.delivered());
        assert_eq!(event.to_string(), "BUFFER_REPLAYED (2 events)");
    }
}
