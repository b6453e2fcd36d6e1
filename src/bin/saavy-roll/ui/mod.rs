//! TUI module for saavy-roll
//!
//! Transport bar on top, the scrolling piano roll below it.

mod roll;
mod transport;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use roll::{render_roll, PIXELS_PER_COLUMN};
use transport::{render_transport, TransportState};

use super::app::RollVisualizer;

/// Draw one frame; also resizes the viewport to the roll's area
pub fn render(frame: &mut Frame, vis: &mut RollVisualizer, status: &str) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport bar
            Constraint::Min(6),    // Piano roll
            Constraint::Length(1), // Status + help
        ])
        .split(area);

    render_transport(frame, chunks[0], &TransportState::from_visualizer(vis));

    // Borders take one column each side
    let roll_columns = chunks[1].width.saturating_sub(2) as f64;
    vis.viewport_mut().set_width(roll_columns * PIXELS_PER_COLUMN);
    render_roll(frame, chunks[1], vis);

    let help = Paragraph::new(format!(
        " {status}  |  [Space] Play/Stop  [+/-] Tempo  [←/→] Scroll  [Q] Quit"
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[2]);
}
