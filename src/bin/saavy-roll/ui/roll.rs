//! Piano roll widget - the display list projected onto a braille canvas

use ratatui::{
    layout::Rect,
    style::Color,
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Line, Rectangle},
        Block, Borders,
    },
    Frame,
};

use saavy_roll::render::Rgba;

use super::super::app::RollVisualizer;

/// Canvas pixels covered by one terminal column
pub const PIXELS_PER_COLUMN: f64 = 4.0;

/// Terminal color for a fill, darkened by its opacity against the background
fn shade(color: Rgba) -> Color {
    let a = color.a.clamp(0.0, 1.0);
    let scale = |c: u8| (c as f64 * a).round() as u8;
    Color::Rgb(scale(color.r), scale(color.g), scale(color.b))
}

/// Render the visible part of the roll with a playhead
pub fn render_roll(frame: &mut Frame, area: Rect, vis: &RollVisualizer) {
    let block = Block::default().title(" Piano roll ").borders(Borders::ALL);

    let Some(drawing) = vis.drawing() else {
        frame.render_widget(block, area);
        return;
    };

    let (left, right) = vis.viewport().span();
    let height = drawing.canvas_size().height;
    // On the highlighted note's left edge, spacing offset included
    let playhead = vis.current_x().filter(|_| vis.is_playing());

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([left, right])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for filled in drawing.surface().visible(left, right) {
                let r = filled.rect;
                // Canvas y grows upward
                ctx.draw(&Rectangle {
                    x: r.x,
                    y: height - r.bottom(),
                    width: r.w,
                    height: r.h,
                    color: shade(filled.color),
                });
            }
            if let Some(x) = playhead {
                ctx.draw(&Line {
                    x1: x,
                    y1: 0.0,
                    x2: x,
                    y2: height,
                    color: Color::Yellow,
                });
            }
        });

    frame.render_widget(canvas, area);
}
