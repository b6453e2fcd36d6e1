use std::sync::Arc;

use crate::sequencing::Note;

use super::bank::SampleBank;

/// Fade applied when a note is released before its sample ends
const RELEASE_SECONDS: f32 = 0.05;
/// Overall output level; leaves headroom for chords
const MASTER_GAIN: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Available for allocation
    Active,    // Playing, note held
    Releasing, // Note released, fading out
}

/// One sample playing back
#[derive(Debug)]
struct Voice {
    /// Index of the note in its sequence
    note_index: usize,
    sample: Option<Arc<[f32]>>,
    position: usize,
    gain: f32,
    /// Per-sample gain step while releasing
    release_step: f32,
    state: VoiceState,
    age: u64,
}

impl Voice {
    fn new() -> Self {
        Self {
            note_index: 0,
            sample: None,
            position: 0,
            gain: 0.0,
            release_step: 0.0,
            state: VoiceState::Free,
            age: 0,
        }
    }

    fn start(&mut self, note_index: usize, sample: Arc<[f32]>, velocity: u8, age: u64) {
        self.note_index = note_index;
        self.sample = Some(sample);
        self.position = 0;
        self.gain = velocity as f32 / 127.0;
        self.state = VoiceState::Active;
        self.age = age;
    }

    fn release(&mut self, sample_rate: f32) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            self.release_step = self.gain / (RELEASE_SECONDS * sample_rate).max(1.0);
        }
    }

    fn free(&mut self) {
        self.state = VoiceState::Free;
        self.sample = None;
    }

    fn render_add(&mut self, out: &mut [f32]) {
        let Some(sample) = self.sample.as_ref() else {
            self.state = VoiceState::Free;
            return;
        };

        for o in out.iter_mut() {
            if self.position >= sample.len() || self.gain <= 0.0 {
                self.state = VoiceState::Free;
                break;
            }
            *o += sample[self.position] * self.gain * MASTER_GAIN;
            self.position += 1;
            if self.state == VoiceState::Releasing {
                self.gain -= self.release_step;
            }
        }

        if self.state == VoiceState::Free {
            self.sample = None;
        }
    }
}

/// Polyphonic sample player with fixed voice count
///
/// Voices are allocated up front so nothing allocates while rendering.
/// When all voices are busy the oldest releasing voice is stolen, then the
/// oldest voice of any kind.
#[derive(Debug)]
pub struct Mixer {
    voices: Vec<Voice>,
    bank: Option<Arc<SampleBank>>,
    sample_rate: f32,
    frame_counter: u64,
}

impl Mixer {
    pub fn new(sample_rate: f32, max_voices: usize) -> Self {
        Self {
            voices: (0..max_voices.max(1)).map(|_| Voice::new()).collect(),
            bank: None,
            sample_rate,
            frame_counter: 0,
        }
    }

    /// Swap in the samples for a new sequence, silencing everything
    pub fn set_bank(&mut self, bank: Arc<SampleBank>) {
        self.all_notes_off_now();
        self.bank = Some(bank);
    }

    pub fn note_on(&mut self, note_index: usize, note: &Note) {
        let Some(sample) = self
            .bank
            .as_ref()
            .and_then(|bank| bank.get(note.pitch, note.is_drum))
            .cloned()
        else {
            return;
        };

        let age = self.frame_counter;
        if let Some(voice) = self.allocate_voice() {
            voice.start(note_index, sample, note.velocity, age);
        }
    }

    pub fn note_off(&mut self, note_index: usize) {
        let sample_rate = self.sample_rate;
        for voice in &mut self.voices {
            if voice.state == VoiceState::Active && voice.note_index == note_index {
                voice.release(sample_rate);
            }
        }
    }

    /// Release every voice with a short fade
    pub fn all_notes_off(&mut self) {
        let sample_rate = self.sample_rate;
        for voice in &mut self.voices {
            voice.release(sample_rate);
        }
    }

    fn all_notes_off_now(&mut self) {
        for voice in &mut self.voices {
            voice.free();
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| v.state != VoiceState::Free)
            .count()
    }

    /// Mix all voices into `out` (overwrites)
    pub fn render_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        for voice in &mut self.voices {
            if voice.state != VoiceState::Free {
                voice.render_add(out);
            }
        }
        self.frame_counter += out.len() as u64;
    }

    fn allocate_voice(&mut self) -> Option<&mut Voice> {
        // First pass: find free voice index
        if let Some(idx) = self.voices.iter().position(|v| v.state == VoiceState::Free) {
            return Some(&mut self.voices[idx]);
        }

        // Second pass: steal oldest releasing voice, then oldest overall
        let steal_idx = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.state == VoiceState::Releasing)
            .min_by_key(|(_, v)| v.age)
            .or_else(|| self.voices.iter().enumerate().min_by_key(|(_, v)| v.age))
            .map(|(idx, _)| idx);

        steal_idx.map(|idx| &mut self.voices[idx])
    }
}
