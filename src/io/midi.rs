//! Standard MIDI File decoding.
//!
//! Tracks are merged into a single [`NoteSequence`]; tempo changes from any
//! track apply to all of them, so note times come out in seconds along one
//! shared timeline.

use std::collections::{HashMap, VecDeque};

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::error::DecodeError;
use crate::sequencing::{Note, NoteSequence};

/// Microseconds per quarter note when a file has no tempo event (120 qpm)
const DEFAULT_TEMPO_USEC: u32 = 500_000;
/// Percussion channel (channel 10, zero-based)
const DRUM_CHANNEL: u8 = 9;

/// Decode a Standard MIDI File into a note sequence
pub fn decode(bytes: &[u8]) -> Result<NoteSequence, DecodeError> {
    let smf = Smf::parse(bytes)?;

    let mut tempo_changes: Vec<(u64, u32)> = Vec::new();
    let mut raw_notes: Vec<RawNote> = Vec::new();

    for track in &smf.tracks {
        let mut tick: u64 = 0;
        let mut open: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();
        let mut programs = [0u8; 16];

        for event in track.iter() {
            tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            open.entry((channel, key.as_int()))
                                .or_default()
                                .push_back((tick, vel.as_int()));
                        }
                        // NoteOn with velocity 0 is a note-off
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            let key = key.as_int();
                            if let Some((start, vel)) =
                                open.get_mut(&(channel, key)).and_then(|q| q.pop_front())
                            {
                                raw_notes.push(RawNote {
                                    start,
                                    end: tick,
                                    pitch: key,
                                    velocity: vel,
                                    program: programs[channel as usize],
                                    channel,
                                });
                            }
                        }
                        MidiMessage::ProgramChange { program } => {
                            programs[channel as usize] = program.as_int();
                        }
                        _ => {}
                    }
                }
                TrackEventKind::Meta(MetaMessage::Tempo(usec)) => {
                    tempo_changes.push((tick, usec.as_int()));
                }
                _ => {}
            }
        }

        // Notes still sounding at end of track end there
        for ((channel, key), starts) in open {
            for (start, vel) in starts {
                raw_notes.push(RawNote {
                    start,
                    end: tick,
                    pitch: key,
                    velocity: vel,
                    program: programs[channel as usize],
                    channel,
                });
            }
        }
    }

    let clock = TickClock::new(smf.header.timing, tempo_changes)?;

    // Keep a deterministic order for notes sharing an onset
    raw_notes.sort_by_key(|n| (n.start, n.pitch, n.end));

    let mut builder = NoteSequence::builder().tempo(clock.initial_qpm());
    for raw in &raw_notes {
        builder.push(Note {
            start_time: clock.seconds(raw.start),
            end_time: clock.seconds(raw.end),
            pitch: raw.pitch,
            velocity: raw.velocity,
            program: raw.program,
            is_drum: raw.channel == DRUM_CHANNEL,
        });
    }
    let sequence = builder.build();

    log::debug!(
        "decoded {} notes from {} tracks ({:.1} qpm, {:.2}s)",
        sequence.len(),
        smf.tracks.len(),
        sequence.tempo_qpm(),
        sequence.total_time()
    );

    Ok(sequence)
}

/// A note in ticks, before tempo is applied
struct RawNote {
    start: u64,
    end: u64,
    pitch: u8,
    velocity: u8,
    program: u8,
    channel: u8,
}

/// Converts absolute ticks to seconds
enum TickClock {
    /// Tempo map segments: (start tick, seconds at start tick, seconds per tick)
    Metrical {
        segments: Vec<(u64, f64, f64)>,
        initial_usec: u32,
    },
    /// SMPTE timing: fixed seconds per tick, tempo only informs qpm
    Timecode {
        seconds_per_tick: f64,
        initial_usec: u32,
    },
}

impl TickClock {
    fn new(timing: Timing, mut tempo_changes: Vec<(u64, u32)>) -> Result<Self, DecodeError> {
        tempo_changes.sort_by_key(|&(tick, _)| tick);
        let initial_usec = tempo_changes
            .first()
            .map(|&(_, usec)| usec)
            .unwrap_or(DEFAULT_TEMPO_USEC);

        match timing {
            Timing::Metrical(ppq) => {
                let ppq = ppq.as_int();
                if ppq == 0 {
                    return Err(DecodeError::UnsupportedTiming(
                        "zero ticks per quarter note".into(),
                    ));
                }
                let spt = |usec: u32| usec as f64 * 1e-6 / ppq as f64;

                let mut segments = vec![(0u64, 0.0f64, spt(DEFAULT_TEMPO_USEC))];
                for (tick, usec) in tempo_changes {
                    let &(last_tick, last_secs, last_spt) = segments.last().unwrap_or(&(0, 0.0, 0.0));
                    let secs = last_secs + (tick - last_tick) as f64 * last_spt;
                    if tick == last_tick {
                        segments.pop();
                    }
                    segments.push((tick, secs, spt(usec)));
                }

                Ok(Self::Metrical {
                    segments,
                    initial_usec,
                })
            }
            Timing::Timecode(fps, ticks_per_frame) => {
                let ticks_per_second = fps.as_f32() as f64 * ticks_per_frame as f64;
                if ticks_per_second <= 0.0 {
                    return Err(DecodeError::UnsupportedTiming(
                        "zero ticks per frame".into(),
                    ));
                }
                Ok(Self::Timecode {
                    seconds_per_tick: 1.0 / ticks_per_second,
                    initial_usec,
                })
            }
        }
    }

    fn seconds(&self, tick: u64) -> f64 {
        match self {
            Self::Metrical { segments, .. } => {
                let idx = segments.partition_point(|&(start, _, _)| start <= tick);
                let (start, secs, spt) = segments[idx.saturating_sub(1)];
                secs + (tick - start) as f64 * spt
            }
            Self::Timecode {
                seconds_per_tick, ..
            } => tick as f64 * seconds_per_tick,
        }
    }

    fn initial_qpm(&self) -> f64 {
        let usec = match self {
            Self::Metrical { initial_usec, .. } | Self::Timecode { initial_usec, .. } => {
                *initial_usec
            }
        };
        60_000_000.0 / usec.max(1) as f64
    }
}
