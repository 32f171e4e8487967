//! Core interception state machine
//!
//! Classifies each meta session as a solo tap (fire the configured chord)
//! or a combo (hand the keys back to the platform), deciding per event
//! whether the hook should suppress it or let it through.

use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::config::ShortcutSpec;
use crate::events::{ChordTrigger, StateEvent};
use crate::hotkey::{classify, KeyCode, KeyRole, KeyTransition, ModifierState, RawKeyEvent};
use crate::inject::{Emitter, InputSink};

use super::session::PendingKeyBuffer;

/// Session states, derived from the modifier flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// No meta session in progress
    #[default]
    Idle,
    /// Meta is held and nothing else has gone down yet
    MetaHeldAmbiguous,
    /// Meta is held as part of a combo; events pass to the platform
    MetaHeldPassthrough,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::MetaHeldAmbiguous => write!(f, "MetaHeldAmbiguous"),
            State::MetaHeldPassthrough => write!(f, "MetaHeldPassthrough"),
        }
    }
}

/// Hook verdict for a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Hand the event on to the platform
    Pass,
    /// Swallow the event
    Suppress,
}

/// The interceptor that owns all session state.
///
/// One instance lives on the hook thread for the lifetime of the hook.
pub struct Interceptor<S: InputSink> {
    shortcut: ShortcutSpec,
    emitter: Emitter<S>,
    modifiers: ModifierState,
    buffer: PendingKeyBuffer,
    /// Physical meta key that opened the current session
    meta_key: KeyCode,
    /// Time when passthrough was entered
    passthrough_since: Option<Instant>,
    /// Other meta key whose down reached the platform and is still held
    held_meta: Option<KeyCode>,
    /// Channel for emitting state events
    event_tx: broadcast::Sender<StateEvent>,
}

impl<S: InputSink> Interceptor<S> {
    pub fn new(
        shortcut: ShortcutSpec,
        emitter: Emitter<S>,
        event_tx: broadcast::Sender<StateEvent>,
    ) -> Self {
        Self {
            shortcut,
            emitter,
            modifiers: ModifierState::default(),
            buffer: PendingKeyBuffer::new(),
            meta_key: KeyCode::LWIN,
            passthrough_since: None,
            held_meta: None,
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> State {
        match (self.modifiers.meta, self.modifiers.passthrough) {
            (false, _) => State::Idle,
            (true, false) => State::MetaHeldAmbiguous,
            (true, true) => State::MetaHeldPassthrough,
        }
    }

    pub fn modifiers(&self) -> ModifierState {
        self.modifiers
    }

    pub fn buffer(&self) -> &PendingKeyBuffer {
        &self.buffer
    }

    /// Decide what happens to one raw event
    pub fn handle(&mut self, event: RawKeyEvent) -> Verdict {
        // Anything injected, by us or anyone else, is never reclassified
        if event.injected || event.own_tag {
            trace!(
                key = %event.code,
                injected = event.injected,
                own_tag = event.own_tag,
                "ignoring injected event"
            );
            return Verdict::Pass;
        }

        let role = classify(event.code);
        trace!(
            key = %event.code,
            transition = ?event.transition,
            state = %self.state(),
            "key event"
        );

        match role {
            KeyRole::Control => {
                self.modifiers.control = event.transition.is_down();
                return self.handle_session_key(event);
            }
            KeyRole::Shift => self.modifiers.shift = event.transition.is_down(),
            KeyRole::Meta | KeyRole::Other => {}
        }

        if event.code == KeyCode::ESCAPE && self.modifiers.is_control_without_shift() {
            if event.transition.is_down() {
                debug!("control+escape detected");
                self.fire_chord(ChordTrigger::ControlEscape);
            }
            return Verdict::Suppress;
        }

        if role == KeyRole::Meta {
            return self.handle_meta(event);
        }

        self.handle_session_key(event)
    }

    /// Meta key transitions
    fn handle_meta(&mut self, event: RawKeyEvent) -> Verdict {
        // Already delivered down: repeats and the final up belong to the platform
        if self.held_meta == Some(event.code) {
            if event.transition == KeyTransition::Up {
                trace!(key = %event.code, "held meta key released");
                self.held_meta = None;
            }
            return Verdict::Pass;
        }

        if !self.modifiers.meta {
            return match event.transition {
                KeyTransition::Down => {
                    self.begin_session(event.code);
                    Verdict::Suppress
                }
                KeyTransition::Up => Verdict::Pass,
            };
        }

        // The other meta key counts as an ordinary key within the session
        if event.code != self.meta_key {
            let verdict = self.handle_session_key(event);
            if verdict == Verdict::Pass && event.transition.is_down() {
                self.held_meta = Some(event.code);
            }
            return verdict;
        }

        match event.transition {
            // Auto-repeat of the held meta key
            KeyTransition::Down if self.modifiers.passthrough => Verdict::Pass,
            KeyTransition::Down => Verdict::Suppress,
            KeyTransition::Up => {
                self.end_session();
                Verdict::Suppress
            }
        }
    }

    /// Non-meta keys, plus control, shift and the second meta key
    fn handle_session_key(&mut self, event: RawKeyEvent) -> Verdict {
        if !self.modifiers.meta || self.modifiers.passthrough {
            return Verdict::Pass;
        }

        match event.transition {
            KeyTransition::Down => {
                self.enter_passthrough(event.code);
                Verdict::Pass
            }
            KeyTransition::Up => {
                trace!(key = %event.code, "buffering key-up");
                self.buffer.push(event.stroke());
                Verdict::Suppress
            }
        }
    }

    fn begin_session(&mut self, meta_key: KeyCode) {
        debug!(key = %meta_key, "meta session started");
        self.modifiers.meta = true;
        self.modifiers.passthrough = false;
        self.meta_key = meta_key;
        self.buffer.clear();
    }

    fn enter_passthrough(&mut self, trigger: KeyCode) {
        // The platform never saw the original meta-down, nor the key-ups held back since
        if self.buffer.is_empty() {
            if !self.emitter.emit_key(self.meta_key, KeyTransition::Down) {
                warn!(key = %self.meta_key, "failed to re-inject meta key-down");
            }
        } else {
            let events = self.buffer.len();
            let delivered = self
                .emitter
                .emit_buffered(self.meta_key, self.buffer.strokes(), None);

            debug!(events, delivered, "replayed buffered keys after meta-down");
            self.emit_event(StateEvent::BufferReplayed { events, delivered });
        }
        self.modifiers.passthrough = true;
        self.passthrough_since = Some(Instant::now());
        self.buffer.clear();

        debug!(key = %trigger, "second key detected, entering passthrough");
        self.emit_event(StateEvent::PassthroughEntered { key: trigger });
    }

    fn end_session(&mut self) {
        if self.modifiers.passthrough {
            let delivered = self.emitter.emit_key(self.meta_key, KeyTransition::Up);
            let duration_ms = self
                .passthrough_since
                .map(|t| t.elapsed().as_millis() as u64)
                .unwrap_or(0);

            debug!(duration_ms, delivered, "passthrough ended");
            self.emit_event(StateEvent::PassthroughExited {
                duration_ms,
                delivered,
            });
        } else {
            self.fire_chord(ChordTrigger::MetaTap);

            // Keys pressed before meta still need their release, without meta around it
            if !self.buffer.is_empty() {
                let events = self.buffer.len();
                let delivered = self.emitter.emit_sequence(self.buffer.strokes());

                debug!(events, delivered, "released buffered keys");
                self.emit_event(StateEvent::BufferReplayed { events, delivered });
            }
        }

        self.modifiers = ModifierState::default();
        self.passthrough_since = None;
        self.buffer.clear();
    }

    fn fire_chord(&mut self, trigger: ChordTrigger) {
        let delivered = self.emitter.emit_chord(&self.shortcut);
        if delivered {
            info!(?trigger, shortcut = %self.shortcut, "shortcut fired");
        } else {
            warn!(?trigger, shortcut = %self.shortcut, "shortcut injection failed");
        }
        self.emit_event(StateEvent::ChordFired { trigger, delivered });
    }

    fn emit_event(&self, event: StateEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    #[cfg(test)]
    fn emitter_mut(&mut self) -> &mut Emitter<S> {
        &mut self.emitter
    }
}
