//! AudioPlayer - plays a note sequence through the default output device
//!
//! The cpal callback owns the scheduler and the mixer. The UI thread talks
//! to it through two lock-free rings:
//!
//! ```text
//!   UI thread ──Control──▶ audio callback ──AudioEvent──▶ UI thread (poll)
//! ```
//!
//! Nothing in the callback blocks. If the event ring is full, note-ons are
//! dropped and counted; the UI logs the count on its next poll.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::PlaybackError;
use crate::sequencing::NoteSequence;

use super::{
    Mixer, NoteScheduler, PlaybackCallback, PlaybackDriver, SampleBank, ScheduledEvent, Transport,
};

/// Largest block rendered in one go
pub const MAX_BLOCK_SIZE: usize = 2048;
/// Simultaneous sample voices
const MAX_VOICES: usize = 32;
const CONTROL_QUEUE_SIZE: usize = 64;
const EVENT_QUEUE_SIZE: usize = 1024;

/// Commands sent from UI thread to audio thread
enum Control {
    /// New sequence and its samples; stops playback
    Load {
        sequence: Arc<NoteSequence>,
        bank: Arc<SampleBank>,
    },
    /// Rewind and play with this speed
    Start { speed: f64 },
    Stop,
    /// Change speed mid-play
    Speed(f64),
}

/// Notifications sent from audio thread to UI thread (Copy, no allocations)
#[derive(Debug, Clone, Copy)]
enum AudioEvent {
    NoteOn(usize),
    Finished,
}

/// State owned by the audio callback
struct AudioEngine {
    scheduler: NoteScheduler,
    mixer: Mixer,
    control_rx: Consumer<Control>,
    event_tx: Producer<AudioEvent>,
    position: Arc<AtomicU64>,
    dropped: Arc<AtomicUsize>,
    sample_rate: f32,
}

impl AudioEngine {
    fn handle_controls(&mut self) {
        while let Ok(control) = self.control_rx.pop() {
            match control {
                Control::Load { sequence, bank } => {
                    self.scheduler.load(sequence);
                    self.mixer.set_bank(bank);
                }
                Control::Start { speed } => {
                    self.mixer.all_notes_off();
                    self.scheduler.set_speed(speed);
                    self.scheduler.start();
                }
                Control::Stop => {
                    let mixer = &mut self.mixer;
                    self.scheduler.stop(&mut |event| {
                        if let ScheduledEvent::NoteOff(index) = event {
                            mixer.note_off(index);
                        }
                    });
                }
                Control::Speed(speed) => self.scheduler.set_speed(speed),
            }
        }
    }

    /// Render one block of mono audio
    fn process_block(&mut self, block: &mut [f32]) {
        let Self {
            scheduler,
            mixer,
            event_tx,
            position,
            dropped,
            sample_rate,
            ..
        } = self;

        // Process scheduler (triggers note events)
        let sequence = scheduler.sequence().cloned();
        scheduler.process_block(block.len(), *sample_rate as f64, &mut |event| match event {
            ScheduledEvent::NoteOn(index) => {
                if let Some(note) = sequence.as_ref().and_then(|s| s.notes().get(index)) {
                    mixer.note_on(index, note);
                }
                if event_tx.push(AudioEvent::NoteOn(index)).is_err() {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            ScheduledEvent::NoteOff(index) => mixer.note_off(index),
            ScheduledEvent::Finished => {
                if event_tx.push(AudioEvent::Finished).is_err() {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        mixer.render_block(block);
        position.store(scheduler.position().to_bits(), Ordering::Relaxed);
    }
}

/// Driver backed by the default cpal output device
pub struct AudioPlayer {
    _stream: cpal::Stream,
    control_tx: Producer<Control>,
    events: EventReceiver,
    transport: Transport,
    sample_rate: f32,
}

impl AudioPlayer {
    /// Open the default output device and start its (silent) stream
    pub fn new() -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| PlaybackError::Device(e.to_string()))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let (control_tx, control_rx) = RingBuffer::<Control>::new(CONTROL_QUEUE_SIZE);
        let (event_tx, event_rx) = RingBuffer::<AudioEvent>::new(EVENT_QUEUE_SIZE);
        let position = Arc::new(AtomicU64::new(0f64.to_bits()));
        let dropped = Arc::new(AtomicUsize::new(0));

        let mut engine = AudioEngine {
            scheduler: NoteScheduler::new(),
            mixer: Mixer::new(sample_rate, MAX_VOICES),
            control_rx,
            event_tx,
            position: position.clone(),
            dropped: dropped.clone(),
            sample_rate,
        };

        // Buffer reused by audio callback
        let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _| {
                    engine.handle_controls();

                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;
                    while frames_written < total_frames {
                        let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                        let block = &mut render_buf[..frames_to_render];
                        engine.process_block(block);

                        // Copy to output (mono to all channels)
                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            for ch in 0..channels {
                                data[out_off + i * channels + ch] = s;
                            }
                        }

                        frames_written += frames_to_render;
                    }
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| PlaybackError::Device(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PlaybackError::Device(e.to_string()))?;

        log::info!("audio output: {sample_rate} Hz, {channels} channels");

        Ok(Self {
            _stream: stream,
            control_tx,
            events: EventReceiver::new(event_rx, position, dropped),
            transport: Transport::new(),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn send(&mut self, control: Control) {
        if self.control_tx.push(control).is_err() {
            log::warn!("audio control queue full, command dropped");
        }
    }
}

impl PlaybackDriver for AudioPlayer {
    fn load_samples(&mut self, sequence: &Arc<NoteSequence>) -> Result<(), PlaybackError> {
        let bank = Arc::new(SampleBank::load(sequence, self.sample_rate)?);
        self.send(Control::Load {
            sequence: sequence.clone(),
            bank,
        });
        self.transport.loaded = Some(sequence.clone());
        self.events.end();
        Ok(())
    }

    fn start(&mut self, sequence: &Arc<NoteSequence>) -> Result<(), PlaybackError> {
        self.transport.check_ready(sequence)?;
        let speed = self.transport.speed(sequence);
        self.send(Control::Start { speed });
        self.events.begin(sequence.clone());
        log::info!("playback started at {} qpm", self.transport.qpm);
        Ok(())
    }

    fn stop(&mut self) {
        self.send(Control::Stop);
        self.events.end();
        log::info!("playback stopped");
    }

    fn set_tempo(&mut self, qpm: f64) {
        self.transport.qpm = qpm;
        if let Some(sequence) = &self.events.playing {
            let speed = self.transport.speed(sequence);
            self.send(Control::Speed(speed));
        }
    }

    fn tempo(&self) -> f64 {
        self.transport.qpm
    }

    fn is_playing(&self) -> bool {
        self.events.playing.is_some()
    }

    fn position(&self) -> f64 {
        self.events.position()
    }

    fn poll(&mut self, callback: &mut dyn PlaybackCallback) {
        self.events.poll(callback);
    }
}

/// UI side of the event ring: turns audio-thread events into callbacks
struct EventReceiver {
    event_rx: Consumer<AudioEvent>,
    position: Arc<AtomicU64>,
    dropped: Arc<AtomicUsize>,
    /// Sequence handed to the audio thread by the last `start`
    playing: Option<Arc<NoteSequence>>,
    /// Events were dropped this run, so `Finished` may never arrive
    lossy: bool,
}

impl EventReceiver {
    fn new(
        event_rx: Consumer<AudioEvent>,
        position: Arc<AtomicU64>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            event_rx,
            position,
            dropped,
            playing: None,
            lossy: false,
        }
    }

    fn begin(&mut self, sequence: Arc<NoteSequence>) {
        // Drop notifications from an earlier run
        while self.event_rx.pop().is_ok() {}
        self.dropped.store(0, Ordering::Relaxed);
        self.lossy = false;
        self.playing = Some(sequence);
    }

    fn end(&mut self) {
        self.playing = None;
    }

    fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Relaxed))
    }

    fn poll(&mut self, callback: &mut dyn PlaybackCallback) {
        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            log::warn!("{dropped} playback notifications dropped (UI fell behind)");
            self.lossy = true;
        }

        let Some(sequence) = self.playing.clone() else {
            // Stopped: discard anything still in flight
            while self.event_rx.pop().is_ok() {}
            return;
        };

        while let Ok(event) = self.event_rx.pop() {
            match event {
                AudioEvent::NoteOn(index) => {
                    if let Some(note) = sequence.notes().get(index) {
                        callback.run(note);
                    }
                }
                AudioEvent::Finished => {
                    self.finish(callback);
                    return;
                }
            }
        }

        // A dropped `Finished` would leave us playing forever
        if self.lossy && self.position() >= sequence.total_time() {
            log::debug!("finish inferred from position");
            self.finish(callback);
        }
    }

    fn finish(&mut self, callback: &mut dyn PlaybackCallback) {
        self.playing = None;
        callback.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 8_000.0;

    fn engine() -> (AudioEngine, Producer<Control>, Consumer<AudioEvent>) {
        let (control_tx, control_rx) = RingBuffer::<Control>::new(CONTROL_QUEUE_SIZE);
        let (event_tx, event_rx) = RingBuffer::<AudioEvent>::new(EVENT_QUEUE_SIZE);
        let engine = AudioEngine {
            scheduler: NoteScheduler::new(),
            mixer: Mixer::new(SR, MAX_VOICES),
            control_rx,
            event_tx,
            position: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicUsize::new(0)),
            sample_rate: SR,
        };
        (engine, control_tx, event_rx)
    }

    fn load(tx: &mut Producer<Control>, sequence: &Arc<NoteSequence>) {
        let bank = Arc::new(SampleBank::load(sequence, SR).unwrap());
        assert!(tx
            .push(Control::Load {
                sequence: sequence.clone(),
                bank,
            })
            .is_ok());
    }

    #[test]
    fn engine_plays_and_reports_note_ons() {
        let seq = Arc::new(
            NoteSequence::builder()
                .note(0.0, 0.25, 60, 100)
                .note(0.25, 0.5, 64, 100)
                .build(),
        );
        let (mut engine, mut tx, mut rx) = engine();
        load(&mut tx, &seq);
        assert!(tx.push(Control::Start { speed: 1.0 }).is_ok());
        engine.handle_controls();

        let mut block = vec![0.0; 1000];
        let mut events = Vec::new();
        for _ in 0..5 {
            engine.process_block(&mut block);
            while let Ok(e) = rx.pop() {
                events.push(e);
            }
        }

        let ons: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AudioEvent::NoteOn(i) => Some(*i),
                _ => None,
            })
            .collect();
        assert_eq!(ons, vec![0, 1]);
        assert!(matches!(events.last(), Some(AudioEvent::Finished)));
        assert!(f64::from_bits(engine.position.load(Ordering::Relaxed)) >= 0.5);
    }

    #[test]
    fn engine_stop_silences_scheduler() {
        let seq = Arc::new(NoteSequence::builder().note(0.0, 1.0, 60, 100).build());
        let (mut engine, mut tx, mut rx) = engine();
        load(&mut tx, &seq);
        assert!(tx.push(Control::Start { speed: 1.0 }).is_ok());
        engine.handle_controls();

        let mut block = vec![0.0; 256];
        engine.process_block(&mut block);
        assert!(block.iter().any(|s| s.abs() > 0.0));

        assert!(tx.push(Control::Stop).is_ok());
        engine.handle_controls();
        assert!(!engine.scheduler.is_playing());

        while rx.pop().is_ok() {}
        engine.process_block(&mut block);
        assert!(rx.pop().is_err());
    }

    #[test]
    fn full_event_ring_counts_drops() {
        let mut builder = NoteSequence::builder();
        for i in 0..(EVENT_QUEUE_SIZE + 10) {
            builder = builder.note(i as f64 * 1e-4, 1.0, 60, 100);
        }
        let seq = Arc::new(builder.build());
        let (mut engine, mut tx, _rx) = engine();
        load(&mut tx, &seq);
        assert!(tx.push(Control::Start { speed: 1.0 }).is_ok());
        engine.handle_controls();

        let mut block = vec![0.0; 2000];
        engine.process_block(&mut block);
        assert!(engine.dropped.load(Ordering::Relaxed) >= 10);
    }

    #[test]
    fn finish_is_inferred_when_its_event_was_dropped() {
        let mut builder = NoteSequence::builder();
        for i in 0..(EVENT_QUEUE_SIZE + 10) {
            builder = builder.note(i as f64 * 1e-4, 0.2, 60, 100);
        }
        let seq = Arc::new(builder.build());
        let (mut engine, mut tx, rx) = engine();
        let mut receiver =
            EventReceiver::new(rx, engine.position.clone(), engine.dropped.clone());
        load(&mut tx, &seq);
        assert!(tx.push(Control::Start { speed: 1.0 }).is_ok());
        engine.handle_controls();
        receiver.begin(seq.clone());

        // One block runs the whole sequence; the ring overflows before `Finished`
        let mut block = vec![0.0; 2000];
        engine.process_block(&mut block);
        assert!(!engine.scheduler.is_playing());

        let mut stopped = false;
        struct Stop<'a>(&'a mut bool);
        impl PlaybackCallback for Stop<'_> {
            fn run(&mut self, _: &crate::sequencing::Note) {}
            fn stop(&mut self) {
                *self.0 = true;
            }
        }
        receiver.poll(&mut Stop(&mut stopped));
        assert!(stopped);
        assert!(receiver.playing.is_none());
    }

    #[test]
    fn restart_forgets_earlier_drops() {
        let seq = Arc::new(NoteSequence::builder().note(0.0, 1.0, 60, 100).build());
        let (engine, _tx, rx) = engine();
        let mut receiver =
            EventReceiver::new(rx, engine.position.clone(), engine.dropped.clone());

        // Stale state from a finished run
        engine.position.store(5.0f64.to_bits(), Ordering::Relaxed);
        engine.dropped.store(3, Ordering::Relaxed);

        receiver.begin(seq);
        let mut stops = 0;
        struct Count<'a>(&'a mut usize);
        impl PlaybackCallback for Count<'_> {
            fn run(&mut self, _: &crate::sequencing::Note) {}
            fn stop(&mut self) {
                *self.0 += 1;
            }
        }
        receiver.poll(&mut Count(&mut stops));
        assert_eq!(stops, 0);
        assert!(receiver.playing.is_some());
    }
}
