//! App - picks a playback driver, loads the source and runs the event loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;

use saavy_roll::{
    error::PlaybackError,
    io::FileSource,
    playback::{AudioPlayer, PlaybackCallback, PlaybackDriver, SilentPlayer},
    render::{DisplayList, DrawingOptions},
    sequencing::NoteSequence,
    Visualizer, VisualizerEvent,
};

use super::ui;

/// Tempo change per key press, in qpm
const TEMPO_STEP: f64 = 5.0;
const MIN_TEMPO: f64 = 5.0;

/// Audio output when a device is available, a silent clock otherwise
pub enum Player {
    Audio(AudioPlayer),
    Silent(SilentPlayer),
}

impl Player {
    fn open(no_audio: bool) -> Self {
        if no_audio {
            return Self::Silent(SilentPlayer::new());
        }
        match AudioPlayer::new() {
            Ok(player) => Self::Audio(player),
            Err(err) => {
                log::warn!("{err}; continuing without audio");
                Self::Silent(SilentPlayer::new())
            }
        }
    }

    /// Move the silent clock forward; the audio device keeps its own time
    fn tick(&mut self, elapsed: Duration) {
        if let Self::Silent(player) = self {
            player.advance(elapsed.as_secs_f64());
        }
    }

    pub fn has_audio(&self) -> bool {
        matches!(self, Self::Audio(_))
    }

    fn driver(&self) -> &dyn PlaybackDriver {
        match self {
            Self::Audio(player) => player,
            Self::Silent(player) => player,
        }
    }

    fn driver_mut(&mut self) -> &mut dyn PlaybackDriver {
        match self {
            Self::Audio(player) => player,
            Self::Silent(player) => player,
        }
    }
}

impl PlaybackDriver for Player {
    fn load_samples(&mut self, sequence: &Arc<NoteSequence>) -> Result<(), PlaybackError> {
        self.driver_mut().load_samples(sequence)
    }

    fn start(&mut self, sequence: &Arc<NoteSequence>) -> Result<(), PlaybackError> {
        self.driver_mut().start(sequence)
    }

    fn stop(&mut self) {
        self.driver_mut().stop()
    }

    fn set_tempo(&mut self, qpm: f64) {
        self.driver_mut().set_tempo(qpm)
    }

    fn tempo(&self) -> f64 {
        self.driver().tempo()
    }

    fn is_playing(&self) -> bool {
        self.driver().is_playing()
    }

    fn position(&self) -> f64 {
        self.driver().position()
    }

    fn poll(&mut self, callback: &mut dyn PlaybackCallback) {
        self.driver_mut().poll(callback)
    }
}

pub type RollVisualizer = Visualizer<Player, DisplayList, FileSource>;

pub struct App {
    vis: RollVisualizer,
    /// Last lifecycle event or error, shown under the roll
    status: String,
    should_quit: bool,
}

impl App {
    /// Load `source` and get ready to play it at `tempo`
    pub fn open(
        source: &str,
        tempo: f64,
        options: DrawingOptions,
        no_audio: bool,
    ) -> EyreResult<Self> {
        let mut vis = Visualizer::with_options(FileSource, Player::open(no_audio), options);
        vis.set_tempo(tempo)?;
        vis.set_url(source)?;

        let mut app = Self {
            vis,
            status: String::new(),
            should_quit: false,
        };
        app.drain_events();
        Ok(app)
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        let mut last_tick = Instant::now();

        while !self.should_quit {
            let now = Instant::now();
            self.vis.player_mut().tick(now - last_tick);
            last_tick = now;

            self.vis.poll();
            self.drain_events();

            terminal.draw(|frame| ui::render(frame, &mut self.vis, &self.status))?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        self.vis.stop();
        Ok(())
    }

    fn drain_events(&mut self) {
        for event in self.vis.take_events() {
            self.status = match event {
                VisualizerEvent::Loaded { notes, .. } => format!("loaded {notes} notes"),
                VisualizerEvent::Ready => "ready - press space to play".to_string(),
                VisualizerEvent::Finished => "finished".to_string(),
            };
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => self.toggle_playback(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_tempo(TEMPO_STEP),
            KeyCode::Char('-') => self.nudge_tempo(-TEMPO_STEP),
            KeyCode::Left => self.scroll(-0.25),
            KeyCode::Right => self.scroll(0.25),
            _ => {}
        }
    }

    fn toggle_playback(&mut self) {
        if self.vis.is_playing() {
            self.vis.stop();
            self.status = "stopped".to_string();
            return;
        }
        match self.vis.start() {
            Ok(()) => self.status = "playing".to_string(),
            Err(err) => {
                log::warn!("cannot start playback: {err}");
                self.status = err.to_string();
            }
        }
    }

    fn nudge_tempo(&mut self, delta: f64) {
        let qpm = (self.vis.tempo() + delta).max(MIN_TEMPO);
        if let Err(err) = self.vis.set_tempo(qpm) {
            self.status = err.to_string();
        }
    }

    /// Scroll by a fraction of the visible width
    fn scroll(&mut self, pages: f64) {
        let Some(content_width) = self.vis.drawing().map(|d| d.canvas_size().width) else {
            return;
        };
        let viewport = self.vis.viewport_mut();
        let dx = viewport.width * pages;
        viewport.scroll_by(dx, content_width);
    }
}
