//! Synthetic input emitter
//!
//! Re-injects key sequences into the platform input stream. Every injected
//! event carries the process's [`InjectionTag`] so the hook can recognize
//! it when it loops back. Injection goes through the batch facility first
//! and falls back to one-at-a-time injection when the batch is not fully
//! delivered.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ShortcutSpec;
use crate::hotkey::{KeyCode, KeyStroke, KeyTransition};

/// Default pause between events on the sequential fallback path
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(5);

/// Opaque marker stamped on every event this process injects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionTag(usize);

impl InjectionTag {
    /// The marker used by this process
    pub const OWN: InjectionTag = InjectionTag(0xB00B_F00D);

    /// Raw value carried in the platform's extra-info field
    pub fn value(self) -> usize {
        self.0
    }

    /// Check whether a platform extra-info value carries this tag
    pub fn matches(self, extra_info: usize) -> bool {
        self.0 == extra_info
    }
}

/// A key stroke ready for injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticKey {
    pub stroke: KeyStroke,
    pub tag: InjectionTag,
}

/// Platform facility that injects keyboard input
pub trait InputSink {
    /// Inject the whole sequence in one call. Returns how many events the
    /// platform accepted.
    fn send_batch(&mut self, keys: &[SyntheticKey]) -> usize;

    /// Inject a single event through the legacy facility
    fn send_one(&mut self, key: SyntheticKey) -> bool;
}

/// Expand a shortcut into its press/release sequence.
///
/// Modifiers go down in meta, control, alt, shift order, then the main key
/// is tapped and the modifiers are released in reverse.
pub fn chord_sequence(spec: &ShortcutSpec) -> Vec<KeyStroke> {
    let modifiers: Vec<KeyCode> = [
        (spec.meta, KeyCode::LWIN),
        (spec.control, KeyCode::CONTROL),
        (spec.alt, KeyCode::MENU),
        (spec.shift, KeyCode::SHIFT),
    ]
    .into_iter()
    .filter_map(|(held, code)| held.then_some(code))
    .collect();

    let mut sequence = Vec::with_capacity(modifiers.len() * 2 + 2);
    sequence.extend(modifiers.iter().copied().map(KeyStroke::down));
    sequence.push(KeyStroke::down(spec.main_key));
    sequence.push(KeyStroke::up(spec.main_key));
    sequence.extend(modifiers.iter().rev().copied().map(KeyStroke::up));
    sequence
}

/// Injects tagged key sequences through an [`InputSink`]
pub struct Emitter<S: InputSink> {
    sink: S,
    tag: InjectionTag,
    fallback_delay: Duration,
}

impl<S: InputSink> Emitter<S> {
    pub fn new(sink: S, fallback_delay: Duration) -> Self {
        Self {
            sink,
            tag: InjectionTag::OWN,
            fallback_delay,
        }
    }

    /// Fire a shortcut chord
    pub fn emit_chord(&mut self, spec: &ShortcutSpec) -> bool {
        self.emit_sequence(&chord_sequence(spec))
    }

    /// Replay buffered strokes between a lead key-down and an optional
    /// tail key-up, preserving the recorded order.
    pub fn emit_buffered(
        &mut self,
        lead: KeyCode,
        buffered: &[KeyStroke],
        tail: Option<KeyCode>,
    ) -> bool {
        let mut sequence = Vec::with_capacity(buffered.len() + 2);
        sequence.push(KeyStroke::down(lead));
        sequence.extend_from_slice(buffered);
        sequence.extend(tail.map(KeyStroke::up));
        self.emit_sequence(&sequence)
    }

    /// Inject a single key transition
    pub fn emit_key(&mut self, code: KeyCode, transition: KeyTransition) -> bool {
        self.emit_sequence(&[KeyStroke { code, transition }])
    }

    /// Inject a sequence, falling back to sequential injection when the
    /// batch facility delivers fewer events than requested
    pub fn emit_sequence(&mut self, strokes: &[KeyStroke]) -> bool {
        if strokes.is_empty() {
            return true;
        }

        let keys: Vec<SyntheticKey> = strokes
            .iter()
            .map(|&stroke| SyntheticKey {
                stroke,
                tag: self.tag,
            })
            .collect();

        let sent = self.sink.send_batch(&keys);
        if sent == keys.len() {
            debug!(events = keys.len(), "batch injection delivered");
            return true;
        }

        warn!(
            sent,
            expected = keys.len(),
            "batch injection incomplete, falling back to sequential injection"
        );
        self.send_sequential(&keys)
    }

    fn send_sequential(&mut self, keys: &[SyntheticKey]) -> bool {
        for (index, key) in keys.iter().enumerate() {
            if index > 0 && !self.fallback_delay.is_zero() {
                thread::sleep(self.fallback_delay);
            }
            if !self.sink.send_one(*key) {
                warn!(
                    index,
                    key = %key.stroke.code,
                    "sequential injection failed, dropping remaining events"
                );
                return false;
            }
        }
        debug!(events = keys.len(), "sequential injection delivered");
        true
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[cfg(test)]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
