//! Visualizer - one piano roll, one player, one source
//!
//! Owns everything the visualizer needs: where MIDI comes from, the loaded
//! sequence, its drawing, the playback driver and the scroll position.
//! Loading a new source replaces the sequence and rebuilds the drawing.
//!
//! # Example
//!
//! ```ignore
//! use saavy_roll::{io::FileSource, playback::SilentPlayer, render::DisplayList, Visualizer};
//!
//! let mut vis: Visualizer<SilentPlayer, DisplayList> =
//!     Visualizer::new(FileSource, SilentPlayer::new());
//! vis.set_url("song.mid")?;
//! for event in vis.take_events() { /* Ready => enable play */ }
//! vis.start()?;
//! loop {
//!     vis.player_mut().advance(1.0 / 60.0);
//!     vis.poll();
//! }
//! ```

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{PlaybackError, VisualizerError};
use crate::io::{self, FileSource, MidiSource};
use crate::playback::{PlaybackCallback, PlaybackDriver};
use crate::render::{CanvasSize, DrawingOptions, DrawingSurface, NoteSequenceDrawing, Viewport};
use crate::sequencing::{Note, NoteSequence};

/// Lifecycle notifications, drained with [`Visualizer::take_events`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisualizerEvent {
    /// A sequence was decoded and drawn at rest
    Loaded { notes: usize, size: CanvasSize },
    /// Samples are loaded; playback may start
    Ready,
    /// Playback reached the end of the sequence
    Finished,
}

/// Settable attributes, by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Url,
    Tempo,
}

impl FromStr for Attribute {
    type Err = VisualizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(Self::Url),
            "tempo" => Ok(Self::Tempo),
            other => Err(VisualizerError::UnknownAttribute(other.to_string())),
        }
    }
}

pub struct Visualizer<D: PlaybackDriver, S: DrawingSurface + Default, M: MidiSource = FileSource> {
    source: M,
    player: D,
    options: DrawingOptions,
    url: Option<String>,
    sequence: Option<Arc<NoteSequence>>,
    drawing: Option<NoteSequenceDrawing<S>>,
    viewport: Viewport,
    highlight: Option<Highlight>,
    ready: bool,
    events: VecDeque<VisualizerEvent>,
}

impl<D, S, M> Visualizer<D, S, M>
where
    D: PlaybackDriver,
    S: DrawingSurface + Default,
    M: MidiSource,
{
    pub fn new(source: M, player: D) -> Self {
        Self::with_options(source, player, DrawingOptions::default())
    }

    pub fn with_options(source: M, player: D, options: DrawingOptions) -> Self {
        Self {
            source,
            player,
            options,
            url: None,
            sequence: None,
            drawing: None,
            viewport: Viewport::default(),
            highlight: None,
            ready: false,
            events: VecDeque::new(),
        }
    }

    /// Fetch, decode and draw the MIDI file at `url`
    pub fn set_url(&mut self, url: &str) -> Result<(), VisualizerError> {
        self.url = Some(url.to_string());
        let loaded = self
            .source
            .fetch(url)
            .map_err(VisualizerError::from)
            .and_then(|bytes| io::decode(&bytes).map_err(VisualizerError::from))
            .and_then(|sequence| self.load_sequence(sequence));

        if let Err(err) = &loaded {
            log::error!("failed to load {url}: {err}");
        }
        loaded
    }

    /// Replace the current sequence, redraw it at rest and load its samples
    ///
    /// Emits `Loaded` once drawn and `Ready` once samples are loaded.
    pub fn load_sequence(&mut self, sequence: NoteSequence) -> Result<(), VisualizerError> {
        if self.player.is_playing() {
            self.player.stop();
        }
        self.ready = false;
        self.highlight = None;
        self.sequence = None;

        let sequence = Arc::new(sequence);
        let surface = self
            .drawing
            .take()
            .map(NoteSequenceDrawing::into_surface)
            .unwrap_or_default();
        let drawing = NoteSequenceDrawing::with_options(sequence.clone(), surface, self.options)?;
        let size = drawing.canvas_size();

        log::info!(
            "loaded {} notes ({:.2}s at {:.1} qpm), roll {}x{}",
            sequence.len(),
            sequence.total_time(),
            sequence.tempo_qpm(),
            size.width,
            size.height
        );

        self.drawing = Some(drawing);
        self.sequence = Some(sequence.clone());
        self.viewport.reset();
        self.events.push_back(VisualizerEvent::Loaded {
            notes: sequence.len(),
            size,
        });

        self.player.load_samples(&sequence)?;
        self.ready = true;
        self.events.push_back(VisualizerEvent::Ready);
        Ok(())
    }

    /// React to an attribute change; unchanged values are ignored
    pub fn attribute_changed(
        &mut self,
        name: &str,
        old: Option<&str>,
        new: &str,
    ) -> Result<(), VisualizerError> {
        let attribute: Attribute = name.parse()?;
        if old == Some(new) {
            return Ok(());
        }
        match attribute {
            Attribute::Url => self.set_url(new),
            Attribute::Tempo => {
                let qpm = new
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| VisualizerError::InvalidTempo(new.to_string()))?;
                self.set_tempo(qpm)
            }
        }
    }

    /// Set playback tempo in quarter notes per minute
    pub fn set_tempo(&mut self, qpm: f64) -> Result<(), VisualizerError> {
        if !(qpm.is_finite() && qpm > 0.0) {
            return Err(VisualizerError::InvalidTempo(qpm.to_string()));
        }
        self.player.set_tempo(qpm);
        Ok(())
    }

    pub fn tempo(&self) -> f64 {
        self.player.tempo()
    }

    /// Color the first notes (index `<= count`) as primer; `None` for none
    ///
    /// Redraws the loaded sequence at rest.
    pub fn set_primer_notes(&mut self, count: Option<usize>) -> Result<(), VisualizerError> {
        self.options.primer_notes = count;
        if let Some(drawing) = self.drawing.take() {
            let sequence = drawing.sequence().clone();
            let rebuilt =
                NoteSequenceDrawing::with_options(sequence, drawing.into_surface(), self.options)?;
            self.drawing = Some(rebuilt);
            self.highlight = None;
        }
        Ok(())
    }

    /// Start playing the loaded sequence from the beginning
    pub fn start(&mut self) -> Result<(), VisualizerError> {
        let sequence = self.sequence.clone().ok_or(VisualizerError::NothingLoaded)?;
        if !self.ready {
            return Err(PlaybackError::NotReady.into());
        }
        self.player.start(&sequence)?;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Whether samples for the loaded sequence are ready
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Deliver pending playback notifications: redraw and follow each note
    pub fn poll(&mut self) {
        let Self {
            player,
            drawing,
            viewport,
            highlight,
            events,
            ..
        } = self;

        let mut follower = Follower {
            drawing: drawing.as_mut(),
            viewport,
            highlight,
            events,
        };
        player.poll(&mut follower);
    }

    /// Highlight `note` and scroll to keep it in view
    ///
    /// Returns the highlighted note's x, as [`NoteSequenceDrawing::redraw`].
    pub fn on_note(&mut self, note: &Note) -> Option<f64> {
        let mut follower = Follower {
            drawing: self.drawing.as_mut(),
            viewport: &mut self.viewport,
            highlight: &mut self.highlight,
            events: &mut self.events,
        };
        follower.follow(note)
    }

    /// Drain lifecycle events in the order they happened
    pub fn take_events(&mut self) -> Vec<VisualizerEvent> {
        self.events.drain(..).collect()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn sequence(&self) -> Option<&Arc<NoteSequence>> {
        self.sequence.as_ref()
    }

    pub fn drawing(&self) -> Option<&NoteSequenceDrawing<S>> {
        self.drawing.as_ref()
    }

    /// Note highlighted by the last note-on, if any
    pub fn current_note(&self) -> Option<&Note> {
        self.highlight.as_ref().map(|h| &h.note)
    }

    /// Canvas x of the highlighted note, where the playhead belongs
    pub fn current_x(&self) -> Option<f64> {
        self.highlight.as_ref().and_then(|h| h.x)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn player(&self) -> &D {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut D {
        &mut self.player
    }
}

/// Last note-on and where its rectangle landed
#[derive(Debug, Clone)]
struct Highlight {
    note: Note,
    x: Option<f64>,
}

/// Playback callback that keeps the roll in sync
struct Follower<'a, S: DrawingSurface> {
    drawing: Option<&'a mut NoteSequenceDrawing<S>>,
    viewport: &'a mut Viewport,
    highlight: &'a mut Option<Highlight>,
    events: &'a mut VecDeque<VisualizerEvent>,
}

impl<S: DrawingSurface> Follower<'_, S> {
    fn follow(&mut self, note: &Note) -> Option<f64> {
        let drawing = self.drawing.as_mut()?;
        let position = drawing.redraw(Some(note));
        *self.highlight = Some(Highlight {
            note: note.clone(),
            x: position,
        });

        if let Some(x) = position {
            if self.viewport.follow(x) {
                log::trace!("scrolled to {}", self.viewport.scroll_left);
            }
        }
        position
    }
}

impl<S: DrawingSurface> PlaybackCallback for Follower<'_, S> {
    fn run(&mut self, note: &Note) {
        self.follow(note);
    }

    fn stop(&mut self) {
        self.events.push_back(VisualizerEvent::Finished);
    }
}
