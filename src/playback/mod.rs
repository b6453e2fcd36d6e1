// Purpose: turning a note sequence into sound and note-on notifications
// This layer sits beside the renderer; the session wires the two together

pub mod bank;
pub mod mixer;
#[cfg(feature = "rtrb")]
pub mod player;
pub mod scheduler;
pub mod silent;

use std::sync::Arc;

use crate::error::PlaybackError;
use crate::sequencing::{Note, NoteSequence, DEFAULT_QPM};

pub use bank::SampleBank;
pub use mixer::Mixer;
#[cfg(feature = "rtrb")]
pub use player::AudioPlayer;
pub use scheduler::{NoteScheduler, ScheduledEvent};
pub use silent::SilentPlayer;

/// Receives playback notifications on the caller's thread
pub trait PlaybackCallback {
    /// A note just started sounding
    fn run(&mut self, note: &Note);

    /// Playback reached the end of the sequence
    fn stop(&mut self) {}
}

/// Allow closures to receive note-ons
impl<F: FnMut(&Note)> PlaybackCallback for F {
    fn run(&mut self, note: &Note) {
        self(note)
    }
}

/// Plays a note sequence and reports note onsets
///
/// Samples for a sequence must be loaded before it can start. Notifications
/// are buffered by the driver and delivered through [`poll`](Self::poll),
/// in onset order.
pub trait PlaybackDriver {
    /// Prepare audio for `sequence`; must succeed before `start`
    fn load_samples(&mut self, sequence: &Arc<NoteSequence>) -> Result<(), PlaybackError>;

    /// Play `sequence` from the beginning
    fn start(&mut self, sequence: &Arc<NoteSequence>) -> Result<(), PlaybackError>;

    fn stop(&mut self);

    /// Set playback tempo in quarter notes per minute
    fn set_tempo(&mut self, qpm: f64);

    fn tempo(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// Position in sequence seconds
    fn position(&self) -> f64;

    /// Deliver pending notifications to `callback`
    fn poll(&mut self, callback: &mut dyn PlaybackCallback);
}

/// Tempo and readiness bookkeeping shared by the drivers
#[derive(Debug)]
pub(crate) struct Transport {
    pub qpm: f64,
    pub loaded: Option<Arc<NoteSequence>>,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            qpm: DEFAULT_QPM,
            loaded: None,
        }
    }

    /// Fail unless samples were loaded for this exact sequence
    pub fn check_ready(&self, sequence: &Arc<NoteSequence>) -> Result<(), PlaybackError> {
        match &self.loaded {
            Some(loaded) if Arc::ptr_eq(loaded, sequence) => Ok(()),
            _ => Err(PlaybackError::NotReady),
        }
    }

    /// Scheduler speed for the current tempo against `sequence`
    pub fn speed(&self, sequence: &NoteSequence) -> f64 {
        NoteScheduler::speed_for(self.qpm, sequence.tempo_qpm())
    }
}
