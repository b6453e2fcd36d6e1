//! NoteScheduler - tempo-scaled note triggering
//!
//! Walks a note sequence in time and reports note-on/note-off events as the
//! playback position passes them. Used on the audio thread by
//! [`AudioPlayer`](super::player::AudioPlayer) and on the caller's thread by
//! [`SilentPlayer`](super::silent::SilentPlayer).

use std::sync::Arc;

use crate::sequencing::NoteSequence;

/// Something the scheduler reports while advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEvent {
    /// Note at this index starts sounding
    NoteOn(usize),
    /// Note at this index stops sounding
    NoteOff(usize),
    /// Position passed the end of the sequence; playback stopped
    Finished,
}

/// Plays one sequence from the start at a scalable speed
#[derive(Debug)]
pub struct NoteScheduler {
    /// Sequence being played
    sequence: Option<Arc<NoteSequence>>,
    /// Current position in sequence seconds
    position: f64,
    /// Index of the next note to start
    next_index: usize,
    /// Sounding notes: (index, end time)
    active: Vec<(usize, f64)>,
    /// Sequence seconds per wall-clock second
    speed: f64,
    /// Whether playback is active
    playing: bool,
}

impl NoteScheduler {
    pub fn new() -> Self {
        Self {
            sequence: None,
            position: 0.0,
            next_index: 0,
            active: Vec::with_capacity(64),
            speed: 1.0,
            playing: false,
        }
    }

    /// Playback speed for a desired tempo against the sequence's own tempo
    pub fn speed_for(desired_qpm: f64, sequence_qpm: f64) -> f64 {
        if desired_qpm > 0.0 && sequence_qpm > 0.0 {
            desired_qpm / sequence_qpm
        } else {
            1.0
        }
    }

    /// Replace the sequence; playback stops and rewinds
    pub fn load(&mut self, sequence: Arc<NoteSequence>) {
        self.sequence = Some(sequence);
        self.reset();
        self.playing = false;
    }

    pub fn sequence(&self) -> Option<&Arc<NoteSequence>> {
        self.sequence.as_ref()
    }

    /// Set sequence seconds per wall-clock second (can be called at any time)
    pub fn set_speed(&mut self, speed: f64) {
        if speed > 0.0 && speed.is_finite() {
            self.speed = speed;
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Rewind and start playing
    pub fn start(&mut self) {
        self.reset();
        self.playing = self.sequence.is_some();
    }

    /// Stop playback, releasing every sounding note
    pub fn stop(&mut self, emit: &mut impl FnMut(ScheduledEvent)) {
        for (index, _) in self.active.drain(..) {
            emit(ScheduledEvent::NoteOff(index));
        }
        self.playing = false;
    }

    fn reset(&mut self) {
        self.position = 0.0;
        self.next_index = 0;
        self.active.clear();
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current position in sequence seconds
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Advance by `frames` samples at `sample_rate`
    ///
    /// This should be called from the audio callback before rendering voices.
    pub fn process_block(
        &mut self,
        frames: usize,
        sample_rate: f64,
        emit: &mut impl FnMut(ScheduledEvent),
    ) {
        self.advance(frames as f64 / sample_rate, emit);
    }

    /// Advance by `seconds` of wall-clock time
    ///
    /// Notes whose onset is at or before the new position start, in sequence
    /// order; then notes whose end has been reached stop.
    pub fn advance(&mut self, seconds: f64, emit: &mut impl FnMut(ScheduledEvent)) {
        if !self.playing {
            return;
        }
        let Some(sequence) = self.sequence.as_ref() else {
            return;
        };

        let notes = sequence.notes();
        let target = self.position + seconds * self.speed;

        // Note-ons
        while self.next_index < notes.len() && notes[self.next_index].start_time <= target {
            emit(ScheduledEvent::NoteOn(self.next_index));
            self.active
                .push((self.next_index, notes[self.next_index].end_time));
            self.next_index += 1;
        }

        // Note-offs
        self.active.retain(|&(index, end)| {
            if end <= target {
                emit(ScheduledEvent::NoteOff(index));
                false
            } else {
                true
            }
        });

        self.position = target;

        if self.next_index >= notes.len() && self.active.is_empty() {
            self.playing = false;
            emit(ScheduledEvent::Finished);
        }
    }
}

impl Default for NoteScheduler {
    fn default() -> Self {
        Self::new()
    }
}
