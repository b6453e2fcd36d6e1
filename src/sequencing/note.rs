#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single decoded note
///
/// Times are in seconds from the start of the sequence, at the sequence's
/// own tempo (see [`NoteSequence::tempo_qpm`](super::NoteSequence)).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Onset in seconds
    pub start_time: f64,
    /// Release in seconds (never before `start_time`)
    pub end_time: f64,
    /// MIDI note number
    pub pitch: u8,
    /// MIDI velocity (0-127)
    pub velocity: u8,
    /// General MIDI program active when the note started
    pub program: u8,
    /// Whether the note was on the percussion channel
    pub is_drum: bool,
}

impl Note {
    /// Create a melodic note on program 0
    pub fn new(start_time: f64, end_time: f64, pitch: u8, velocity: u8) -> Self {
        Self {
            start_time,
            end_time: end_time.max(start_time),
            pitch,
            velocity,
            program: 0,
            is_drum: false,
        }
    }

    /// Length of the note in seconds
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_is_never_before_start() {
        let note = Note::new(2.0, 1.0, 60, 100);
        assert_eq!(note.end_time, 2.0);
        assert_eq!(note.duration(), 0.0);
    }

    #[test]
    fn duration_is_end_minus_start() {
        let note = Note::new(0.5, 1.75, 64, 80);
        assert_eq!(note.duration(), 1.25);
    }
}
