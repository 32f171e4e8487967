//! Keys recorded while a meta session is undecided

use crate::hotkey::KeyStroke;

/// Ordered strokes suppressed during an ambiguous meta session.
///
/// Only non-empty while meta is held and passthrough is not active.
#[derive(Debug, Default, Clone)]
pub struct PendingKeyBuffer {
    strokes: Vec<KeyStroke>,
}

impl PendingKeyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stroke: KeyStroke) {
        self.strokes.push(stroke);
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    /// Recorded strokes in arrival order
    pub fn strokes(&self) -> &[KeyStroke] {
        &self.strokes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::KeyCode;

    #[test]
    fn test_preserves_order() {
        let mut buffer = PendingKeyBuffer::new();
        buffer.push(KeyStroke::up(KeyCode(0x43)));
        buffer.push(KeyStroke::up(KeyCode(0x41)));
        buffer.push(KeyStroke::up(KeyCode(0x42)));

        let codes: Vec<u16> = buffer.strokes().iter().map(|s| s.code.0).collect();
        assert_eq!(codes, vec![0x43, 0x41, 0x42]);

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
