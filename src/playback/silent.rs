use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::PlaybackError;
use crate::sequencing::NoteSequence;

use super::{NoteScheduler, PlaybackCallback, PlaybackDriver, ScheduledEvent, Transport};

/// Notification waiting for the next `poll`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    NoteOn(usize),
    Finished,
}

/// Driver without an audio device
///
/// Time only moves when the owner calls [`advance`](Self::advance), which
/// makes it usable headless (`--no-audio`) and deterministic in tests.
#[derive(Debug)]
pub struct SilentPlayer {
    transport: Transport,
    scheduler: NoteScheduler,
    pending: VecDeque<Pending>,
}

impl SilentPlayer {
    pub fn new() -> Self {
        Self {
            transport: Transport::new(),
            scheduler: NoteScheduler::new(),
            pending: VecDeque::new(),
        }
    }

    /// Move playback forward by `seconds` of wall-clock time
    pub fn advance(&mut self, seconds: f64) {
        let pending = &mut self.pending;
        self.scheduler.advance(seconds, &mut |event| match event {
            ScheduledEvent::NoteOn(index) => pending.push_back(Pending::NoteOn(index)),
            ScheduledEvent::NoteOff(_) => {}
            ScheduledEvent::Finished => pending.push_back(Pending::Finished),
        });
    }
}

impl Default for SilentPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackDriver for SilentPlayer {
    fn load_samples(&mut self, sequence: &Arc<NoteSequence>) -> Result<(), PlaybackError> {
        if sequence.is_empty() {
            return Err(PlaybackError::EmptySequence);
        }
        self.transport.loaded = Some(sequence.clone());
        Ok(())
    }

    fn start(&mut self, sequence: &Arc<NoteSequence>) -> Result<(), PlaybackError> {
        self.transport.check_ready(sequence)?;
        self.pending.clear();
        self.scheduler.load(sequence.clone());
        self.scheduler.set_speed(self.transport.speed(sequence));
        self.scheduler.start();
        log::info!("silent playback started at {} qpm", self.transport.qpm);
        Ok(())
    }

    fn stop(&mut self) {
        if self.scheduler.is_playing() {
            log::info!("silent playback stopped");
        }
        self.scheduler.stop(&mut |_| {});
        self.pending.clear();
    }

    fn set_tempo(&mut self, qpm: f64) {
        self.transport.qpm = qpm;
        if let Some(sequence) = self.scheduler.sequence() {
            let speed = self.transport.speed(sequence);
            self.scheduler.set_speed(speed);
        }
    }

    fn tempo(&self) -> f64 {
        self.transport.qpm
    }

    fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    fn position(&self) -> f64 {
        self.scheduler.position()
    }

    fn poll(&mut self, callback: &mut dyn PlaybackCallback) {
        let Some(sequence) = self.scheduler.sequence().cloned() else {
            return;
        };
        while let Some(event) = self.pending.pop_front() {
            match event {
                Pending::NoteOn(index) => {
                    if let Some(note) = sequence.notes().get(index) {
                        callback.run(note);
                    }
                }
                Pending::Finished => callback.stop(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::Note;

    struct Recorder {
        pitches: Vec<u8>,
        stopped: bool,
    }

    impl PlaybackCallback for Recorder {
        fn run(&mut self, note: &Note) {
            self.pitches.push(note.pitch);
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    fn seq() -> Arc<NoteSequence> {
        Arc::new(
            NoteSequence::builder()
                .note(0.0, 1.0, 60, 100)
                .note(1.0, 2.0, 64, 100)
                .build(),
        )
    }

    #[test]
    fn start_requires_loaded_samples() {
        let mut player = SilentPlayer::new();
        let seq = seq();
        assert!(matches!(player.start(&seq), Err(PlaybackError::NotReady)));

        player.load_samples(&seq).unwrap();
        assert!(player.start(&seq).is_ok());
        assert!(player.is_playing());
    }

    #[test]
    fn reports_note_ons_then_stop() {
        let mut player = SilentPlayer::new();
        let seq = seq();
        player.load_samples(&seq).unwrap();
        player.start(&seq).unwrap();

        let mut rec = Recorder {
            pitches: vec![],
            stopped: false,
        };
        player.advance(0.5);
        player.poll(&mut rec);
        assert_eq!(rec.pitches, vec![60]);

        player.advance(2.0);
        player.poll(&mut rec);
        assert_eq!(rec.pitches, vec![60, 64]);
        assert!(rec.stopped);
        assert!(!player.is_playing());
    }

    #[test]
    fn tempo_scales_playback() {
        let mut player = SilentPlayer::new();
        let seq = seq();
        player.load_samples(&seq).unwrap();
        player.set_tempo(240.0);
        player.start(&seq).unwrap();

        player.advance(0.5);
        assert_eq!(player.position(), 1.0);
        assert_eq!(player.tempo(), 240.0);

        // Changing tempo mid-play applies from the current position
        player.set_tempo(60.0);
        player.advance(1.0);
        assert_eq!(player.position(), 1.5);
    }

    #[test]
    fn stop_drops_pending_notifications() {
        let mut player = SilentPlayer::new();
        let seq = seq();
        player.load_samples(&seq).unwrap();
        player.start(&seq).unwrap();
        player.advance(1.5);
        player.stop();

        let mut seen = 0;
        player.poll(&mut |_: &Note| seen += 1);
        assert_eq!(seen, 0);
        assert!(!player.is_playing());
    }

    #[test]
    fn empty_sequence_cannot_load() {
        let mut player = SilentPlayer::new();
        let empty = Arc::new(NoteSequence::from_notes(vec![]));
        assert!(matches!(
            player.load_samples(&empty),
            Err(PlaybackError::EmptySequence)
        ));
    }
}
