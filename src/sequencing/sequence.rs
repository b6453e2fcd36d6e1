#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::note::Note;

/// Tempo assumed when a source carries no tempo event (MIDI default)
pub const DEFAULT_QPM: f64 = 120.0;

/// An immutable, chronologically ordered list of notes
///
/// Built once per loaded source; replacing it means building a new one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSequence {
    notes: Vec<Note>,
    tempo_qpm: f64,
    total_time: f64,
}

impl NoteSequence {
    /// Start building a sequence at the default tempo
    pub fn builder() -> NoteSequenceBuilder {
        NoteSequenceBuilder::new()
    }

    /// Wrap notes that are already in onset order
    pub fn from_notes(notes: Vec<Note>) -> Self {
        let total_time = notes.iter().map(|n| n.end_time).fold(0.0, f64::max);
        Self {
            notes,
            tempo_qpm: DEFAULT_QPM,
            total_time,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// The last note in sequence order (not necessarily the last to end)
    pub fn last(&self) -> Option<&Note> {
        self.notes.last()
    }

    /// Tempo the note times were computed at, in quarter notes per minute
    pub fn tempo_qpm(&self) -> f64 {
        self.tempo_qpm
    }

    /// Latest end time over all notes, in seconds
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Lowest and highest pitch, or `None` for an empty sequence
    pub fn pitch_range(&self) -> Option<(u8, u8)> {
        let first = self.notes.first()?.pitch;
        Some(
            self.notes
                .iter()
                .fold((first, first), |(lo, hi), n| (lo.min(n.pitch), hi.max(n.pitch))),
        )
    }
}

/// Builder for constructing sequences with a fluent API
///
/// Notes are sorted by onset on `build()`; notes sharing an onset keep the
/// order they were added in.
#[derive(Debug, Default)]
pub struct NoteSequenceBuilder {
    notes: Vec<Note>,
    tempo_qpm: Option<f64>,
}

impl NoteSequenceBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Set the tempo the note times are expressed at
    pub fn tempo(mut self, qpm: f64) -> Self {
        self.tempo_qpm = Some(qpm);
        self
    }

    /// Add a note (seconds, MIDI pitch, velocity)
    pub fn note(mut self, start_time: f64, end_time: f64, pitch: u8, velocity: u8) -> Self {
        self.notes.push(Note::new(start_time, end_time, pitch, velocity));
        self
    }

    /// Set the program for the last added note
    pub fn with_program(mut self, program: u8) -> Self {
        if let Some(note) = self.notes.last_mut() {
            note.program = program;
        }
        self
    }

    /// Mark the last added note as percussion
    pub fn drum(mut self) -> Self {
        if let Some(note) = self.notes.last_mut() {
            note.is_drum = true;
        }
        self
    }

    /// Add an already constructed note
    pub fn push(&mut self, note: Note) {
        self.notes.push(note);
    }

    pub fn build(mut self) -> NoteSequence {
        self.notes
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let mut sequence = NoteSequence::from_notes(self.notes);
        if let Some(qpm) = self.tempo_qpm {
            sequence.tempo_qpm = qpm;
        }
        sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_sorts_by_onset() {
        let seq = NoteSequence::builder()
            .note(2.0, 3.0, 67, 100)
            .note(0.0, 1.0, 60, 100)
            .note(1.0, 2.0, 64, 100)
            .build();

        let pitches: Vec<_> = seq.notes().iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 64, 67]);
    }

    #[test]
    fn chord_keeps_insertion_order() {
        let seq = NoteSequence::builder()
            .note(0.0, 1.0, 64, 100)
            .note(0.0, 1.0, 60, 100)
            .build();

        assert_eq!(seq.notes()[0].pitch, 64);
        assert_eq!(seq.notes()[1].pitch, 60);
    }

    #[test]
    fn total_time_is_latest_end() {
        let seq = NoteSequence::builder()
            .note(0.0, 4.0, 48, 90)
            .note(1.0, 2.0, 60, 90)
            .build();

        assert_eq!(seq.total_time(), 4.0);
        assert_eq!(seq.last().map(|n| n.end_time), Some(2.0));
    }

    #[test]
    fn pitch_range() {
        let seq = NoteSequence::builder()
            .note(0.0, 1.0, 60, 80)
            .note(1.0, 2.0, 64, 100)
            .build();
        assert_eq!(seq.pitch_range(), Some((60, 64)));
        assert_eq!(NoteSequence::from_notes(vec![]).pitch_range(), None);
    }

    #[test]
    fn default_tempo_is_120() {
        let seq = NoteSequence::builder().note(0.0, 1.0, 60, 80).build();
        assert_eq!(seq.tempo_qpm(), DEFAULT_QPM);

        let seq = NoteSequence::builder().tempo(90.0).note(0.0, 1.0, 60, 80).build();
        assert_eq!(seq.tempo_qpm(), 90.0);
    }

    #[test]
    fn program_and_drum_apply_to_last_note() {
        let seq = NoteSequence::builder()
            .note(0.0, 1.0, 36, 120)
            .drum()
            .note(0.0, 1.0, 60, 80)
            .with_program(40)
            .build();

        assert!(seq.notes()[0].is_drum);
        assert_eq!(seq.notes()[0].program, 0);
        assert!(!seq.notes()[1].is_drum);
        assert_eq!(seq.notes()[1].program, 40);
    }
}
