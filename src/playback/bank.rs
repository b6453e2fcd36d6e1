use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::Arc;

use crate::error::PlaybackError;
use crate::sequencing::NoteSequence;

/*
Sample Bank
===========

Playback reads pre-rendered samples instead of synthesizing in the audio
callback. "Loading samples" for a sequence means rendering one sample per
distinct (pitch, percussion) pair the sequence uses, at the output rate.

Melodic tone
------------

A plucked-string-ish tone: the fundamental plus two overtones, each with its
own exponential decay so the upper partials die out first.

    s(t) = Σ  amp_k · sin(2π · k · f · t) · e^(-t · decay_k)
          k=1..3

    k   amp   decay (1/s)
    1   1.0   2.5
    2   0.5   4.0
    3   0.25  6.0

A short linear attack (5ms) avoids a click at the onset.

Percussion
----------

Pitch selects nothing meaningful for drums in a sketch like this, so every
drum note is a noise burst with a fast exponential decay. Lower pitches
decay slower (kick-ish), higher ones faster (hat-ish).

The Math: frequency from MIDI note
----------------------------------

    f = 440 · 2^((note - 69) / 12)
*/

/// Length of every rendered sample, in seconds
const SAMPLE_SECONDS: f32 = 1.5;
/// Linear fade-in at the start of melodic samples
const ATTACK_SECONDS: f32 = 0.005;
const PARTIALS: [(f32, f32); 3] = [(1.0, 2.5), (0.5, 4.0), (0.25, 6.0)];

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Pre-rendered samples for the notes of one sequence
#[derive(Debug, Clone)]
pub struct SampleBank {
    sample_rate: f32,
    samples: HashMap<(u8, bool), Arc<[f32]>>,
}

impl SampleBank {
    /// Render every sample `sequence` needs
    pub fn load(sequence: &NoteSequence, sample_rate: f32) -> Result<Self, PlaybackError> {
        if sequence.is_empty() {
            return Err(PlaybackError::EmptySequence);
        }

        let mut samples = HashMap::new();
        for note in sequence.notes() {
            samples
                .entry((note.pitch, note.is_drum))
                .or_insert_with(|| {
                    if note.is_drum {
                        render_drum(note.pitch, sample_rate)
                    } else {
                        render_tone(note.pitch, sample_rate)
                    }
                });
        }

        log::info!(
            "loaded {} samples for {} notes at {} Hz",
            samples.len(),
            sequence.len(),
            sample_rate
        );

        Ok(Self {
            sample_rate,
            samples,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, pitch: u8, is_drum: bool) -> Option<&Arc<[f32]>> {
        self.samples.get(&(pitch, is_drum))
    }

    /// Whether every note of `sequence` has a sample
    pub fn covers(&self, sequence: &NoteSequence) -> bool {
        sequence
            .notes()
            .iter()
            .all(|n| self.samples.contains_key(&(n.pitch, n.is_drum)))
    }
}

fn sample_len(sample_rate: f32) -> usize {
    (SAMPLE_SECONDS * sample_rate) as usize
}

fn render_tone(pitch: u8, sample_rate: f32) -> Arc<[f32]> {
    let freq = midi_note_to_freq(pitch);
    let attack = (ATTACK_SECONDS * sample_rate).max(1.0);
    let norm: f32 = PARTIALS.iter().map(|&(amp, _)| amp).sum();

    (0..sample_len(sample_rate))
        .map(|i| {
            let t = i as f32 / sample_rate;
            let mut s = 0.0;
            for (k, &(amp, decay)) in PARTIALS.iter().enumerate() {
                let harmonic = (k + 1) as f32;
                s += amp * (TAU * harmonic * freq * t).sin() * (-t * decay).exp();
            }
            let ramp = (i as f32 / attack).min(1.0);
            s * ramp / norm
        })
        .collect()
}

fn render_drum(pitch: u8, sample_rate: f32) -> Arc<[f32]> {
    // 4..=40 per second, rising with pitch
    let decay = 4.0 + pitch as f32 * (36.0 / 127.0);
    let mut state = 0x9E37_79B9u32 ^ pitch as u32;

    (0..sample_len(sample_rate))
        .map(|i| {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let noise = state as f32 / u32::MAX as f32 * 2.0 - 1.0;
            let t = i as f32 / sample_rate;
            noise * (-t * decay).exp()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 8_000.0;

    #[test]
    fn a440_is_69() {
        assert!((midi_note_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_note_to_freq(81) - 880.0).abs() < 1e-2);
    }

    #[test]
    fn one_sample_per_distinct_pitch() {
        let seq = NoteSequence::builder()
            .note(0.0, 1.0, 60, 100)
            .note(1.0, 2.0, 60, 50)
            .note(2.0, 3.0, 64, 100)
            .note(2.0, 3.0, 36, 100)
            .drum()
            .build();

        let bank = SampleBank::load(&seq, SR).unwrap();
        assert_eq!(bank.len(), 3);
        assert!(bank.get(60, false).is_some());
        assert!(bank.get(36, true).is_some());
        assert!(bank.get(36, false).is_none());
        assert!(bank.covers(&seq));
    }

    #[test]
    fn does_not_cover_other_sequences() {
        let a = NoteSequence::builder().note(0.0, 1.0, 60, 100).build();
        let b = NoteSequence::builder().note(0.0, 1.0, 61, 100).build();
        let bank = SampleBank::load(&a, SR).unwrap();
        assert!(!bank.covers(&b));
    }

    #[test]
    fn empty_sequence_fails() {
        let seq = NoteSequence::from_notes(vec![]);
        assert!(matches!(
            SampleBank::load(&seq, SR),
            Err(PlaybackError::EmptySequence)
        ));
    }

    #[test]
    fn samples_are_bounded_and_decay() {
        let seq = NoteSequence::builder()
            .note(0.0, 1.0, 57, 100)
            .note(0.0, 1.0, 42, 100)
            .drum()
            .build();
        let bank = SampleBank::load(&seq, SR).unwrap();

        for sample in [bank.get(57, false).unwrap(), bank.get(42, true).unwrap()] {
            assert_eq!(sample.len(), (1.5 * SR) as usize);
            assert!(sample.iter().all(|s| s.abs() <= 1.0));

            let peak = |range: std::ops::Range<usize>| {
                sample[range].iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
            };
            let n = sample.len();
            assert!(peak(0..n / 10) > peak(n - n / 10..n));
        }
    }

    #[test]
    fn tone_starts_silent() {
        let seq = NoteSequence::builder().note(0.0, 1.0, 69, 100).build();
        let bank = SampleBank::load(&seq, SR).unwrap();
        assert_eq!(bank.get(69, false).unwrap()[0], 0.0);
    }
}
