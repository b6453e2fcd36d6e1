//! Transport bar widget - shows tempo, play state, position and note info

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_roll::playback::PlaybackDriver;

use super::super::app::RollVisualizer;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Snapshot of what the transport bar shows
pub struct TransportState {
    pub qpm: f64,
    pub is_playing: bool,
    /// Seconds into the sequence
    pub position: f64,
    pub total_time: f64,
    pub notes: usize,
    pub current_pitch: Option<u8>,
    pub audio: bool,
}

impl TransportState {
    pub fn from_visualizer(vis: &RollVisualizer) -> Self {
        let sequence = vis.sequence();
        Self {
            qpm: vis.tempo(),
            is_playing: vis.is_playing(),
            position: vis.player().position(),
            total_time: sequence.map_or(0.0, |s| s.total_time()),
            notes: sequence.map_or(0, |s| s.len()),
            current_pitch: vis.current_note().map(|n| n.pitch),
            audio: vis.player().has_audio(),
        }
    }
}

/// Scientific pitch name, e.g. 60 -> "C4"
fn pitch_name(pitch: u8) -> String {
    let octave = pitch as i32 / 12 - 1;
    format!("{}{}", NOTE_NAMES[pitch as usize % 12], octave)
}

/// Render the transport bar
pub fn render_transport(frame: &mut Frame, area: Rect, state: &TransportState) {
    let block = Block::default().title(" saavy-roll ").borders(Borders::ALL);

    let play_symbol = if state.is_playing { "▶" } else { "■" };
    let play_state_str = if state.is_playing { "Playing" } else { "Stopped" };
    let current = state.current_pitch.map_or_else(|| "-".to_string(), pitch_name);

    let line = Line::from(vec![
        Span::styled(
            format!(" QPM: {:.0}  ", state.qpm),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{} {}  ", play_symbol, play_state_str),
            Style::default().fg(if state.is_playing {
                Color::Green
            } else {
                Color::Yellow
            }),
        ),
        Span::styled(
            format!("{:.1}s / {:.1}s  ", state.position, state.total_time),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Note: {current}  "),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            format!("{} notes  ", state.notes),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            if state.audio { "audio" } else { "silent" },
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(block);
    frame.render_widget(paragraph, area);
}
