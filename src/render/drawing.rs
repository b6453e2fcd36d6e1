//! Piano roll for one note sequence.
//!
//! Sizing happens once when the drawing is built; every `redraw` clears the
//! whole surface and repaints all notes. There is no partial invalidation.
//!
//! Layout per note at index `i`:
//!
//! ```text
//! x = start * pixels_per_time_step + note_spacing * (i + 1)
//! w = (end - start) * pixels_per_time_step
//! y = canvas_height - (pitch - min_pitch) * note_height
//! ```
//!
//! The `note_spacing * (i + 1)` term nudges each successive note a little
//! further right; it is part of the look, not a gap between notes.

use std::sync::Arc;

use crate::error::RenderError;
use crate::sequencing::{Note, NoteSequence};

use super::config::{NotePalette, RenderConfig, Rgb};
use super::surface::{CanvasSize, DrawingSurface, Rect};

/// Everything about a drawing that isn't the sequence or the surface
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrawingOptions {
    pub config: RenderConfig,
    pub palette: NotePalette,
    /// Notes at index `<= primer_notes` are drawn in the primer color.
    /// `None` means there is no primer region.
    pub primer_notes: Option<usize>,
}

/// Opacity for a velocity: `velocity / 100 + 0.2`
///
/// Not capped, so velocities above 80 give values over 1.0.
#[inline]
pub fn opacity(velocity: u8) -> f64 {
    velocity as f64 / 100.0 + 0.2
}

/// Whether `note` should be painted as the one currently sounding
///
/// Matches on a shared onset, or when `note` starts no later and ends no
/// earlier than `current`. This can match several notes at once (a chord,
/// or a long note held under the current one).
#[inline]
pub fn is_current_note(note: &Note, current: Option<&Note>) -> bool {
    match current {
        Some(current) => {
            note.start_time == current.start_time
                || (note.end_time >= current.end_time && note.start_time <= current.start_time)
        }
        None => false,
    }
}

/// A note sequence laid out on a drawing surface
#[derive(Debug)]
pub struct NoteSequenceDrawing<S: DrawingSurface> {
    sequence: Arc<NoteSequence>,
    surface: S,
    config: RenderConfig,
    palette: NotePalette,
    primer_notes: Option<usize>,
    size: CanvasSize,
}

impl<S: DrawingSurface> NoteSequenceDrawing<S> {
    /// Size `surface` for `sequence` and paint it with nothing highlighted
    pub fn new(sequence: Arc<NoteSequence>, surface: S) -> Result<Self, RenderError> {
        Self::with_options(sequence, surface, DrawingOptions::default())
    }

    pub fn with_options(
        sequence: Arc<NoteSequence>,
        mut surface: S,
        options: DrawingOptions,
    ) -> Result<Self, RenderError> {
        let mut config = options.config;
        let size = Self::canvas_size_for(&sequence, &mut config)?;
        surface.resize(size.width, size.height);

        log::debug!(
            "piano roll sized {}x{} for {} notes (pitch {}..{})",
            size.width,
            size.height,
            sequence.len(),
            config.min_pitch,
            config.max_pitch
        );

        let mut drawing = Self {
            sequence,
            surface,
            config,
            palette: options.palette,
            primer_notes: options.primer_notes,
            size,
        };
        drawing.redraw(None);
        Ok(drawing)
    }

    /// Derive the padded pitch range into `config` and compute the canvas size
    fn canvas_size_for(
        sequence: &NoteSequence,
        config: &mut RenderConfig,
    ) -> Result<CanvasSize, RenderError> {
        let (lowest, highest) = sequence.pitch_range().ok_or(RenderError::EmptySequence)?;
        let last = sequence.last().ok_or(RenderError::EmptySequence)?;

        config.min_pitch = lowest as i32 - RenderConfig::PITCH_PADDING;
        config.max_pitch = highest as i32 + RenderConfig::PITCH_PADDING;

        let height = (config.max_pitch - config.min_pitch) as f64 * config.note_height;
        let width = sequence.len() as f64 * config.note_spacing
            + last.end_time * config.pixels_per_time_step;

        Ok(CanvasSize { width, height })
    }

    /// Repaint every note, highlighting whatever matches `current`
    ///
    /// Returns the x of the last note (in sequence order) that matched, or
    /// `None` when nothing is highlighted.
    pub fn redraw(&mut self, current: Option<&Note>) -> Option<f64> {
        self.surface.clear();
        let mut current_position = None;

        for (index, note) in self.sequence.notes().iter().enumerate() {
            let rect = self.note_rect(index, note);
            let highlighted = is_current_note(note, current);

            let color = if highlighted {
                self.palette.current
            } else if self.is_primer(index) {
                self.palette.primer
            } else {
                self.palette.base
            };
            self.surface
                .fill_rect(rect, color.with_opacity(opacity(note.velocity)));

            if highlighted {
                current_position = Some(rect.x);
            }
        }

        current_position
    }

    /// Where the note at `index` is painted
    pub fn note_rect(&self, index: usize, note: &Note) -> Rect {
        let offset = self.config.note_spacing * (index + 1) as f64;
        let x = note.start_time * self.config.pixels_per_time_step + offset;
        let w = note.duration() * self.config.pixels_per_time_step;
        let y = self.size.height
            - (note.pitch as i32 - self.config.min_pitch) as f64 * self.config.note_height;
        Rect::new(x, y, w, self.config.note_height)
    }

    fn is_primer(&self, index: usize) -> bool {
        self.primer_notes.is_some_and(|count| index <= count)
    }

    /// Color a note at `index` would get when not highlighted
    pub fn rest_color(&self, index: usize) -> Rgb {
        if self.is_primer(index) {
            self.palette.primer
        } else {
            self.palette.base
        }
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.size
    }

    /// Geometry including the derived pitch range
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn palette(&self) -> &NotePalette {
        &self.palette
    }

    pub fn sequence(&self) -> &Arc<NoteSequence> {
        &self.sequence
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::{DisplayList, PixelBuffer};

    fn two_notes() -> Arc<NoteSequence> {
        Arc::new(
            NoteSequence::builder()
                .note(0.0, 1.0, 60, 80)
                .note(1.0, 2.0, 64, 100)
                .build(),
        )
    }

    fn draw(seq: Arc<NoteSequence>) -> NoteSequenceDrawing<DisplayList> {
        NoteSequenceDrawing::new(seq, DisplayList::new()).unwrap()
    }

    #[test]
    fn initial_paint_has_no_highlight() {
        let mut drawing = draw(two_notes());
        let palette = NotePalette::default();

        let rects = drawing.surface().rects();
        assert_eq!(rects.len(), 2);
        assert!(rects.iter().all(|f| f.color.r == palette.base.r
            && f.color.g == palette.base.g
            && f.color.b == palette.base.b));

        assert_eq!(drawing.redraw(None), None);
        assert_eq!(drawing.surface().len(), 2);
    }

    #[test]
    fn height_from_padded_pitch_range() {
        // 60..64 padded to 58..66
        let drawing = draw(two_notes());
        assert_eq!(drawing.config().min_pitch, 58);
        assert_eq!(drawing.config().max_pitch, 66);
        assert_eq!(drawing.canvas_size().height, 48.0);
    }

    #[test]
    fn width_from_count_and_last_end() {
        let drawing = draw(two_notes());
        // 2 * 1 + 2.0 * 30
        assert_eq!(drawing.canvas_size().width, 62.0);
        assert_eq!(drawing.surface().size(), drawing.canvas_size());
    }

    #[test]
    fn highlighting_first_note_returns_its_x() {
        let mut drawing = draw(two_notes());
        let current = Note::new(0.0, 1.0, 60, 80);

        assert_eq!(drawing.redraw(Some(&current)), Some(1.0));

        let rects = drawing.surface().rects();
        let pink = NotePalette::default().current;
        assert_eq!((rects[0].color.r, rects[0].color.g), (pink.r, pink.g));
        assert_ne!(rects[1].color.r, pink.r);
    }

    #[test]
    fn single_note_scenario() {
        let seq = Arc::new(NoteSequence::builder().note(5.0, 6.0, 60, 60).build());
        let mut drawing = draw(seq.clone());

        assert_eq!(drawing.canvas_size().width, 181.0);
        assert_eq!(drawing.redraw(Some(&seq.notes()[0])), Some(151.0));
    }

    #[test]
    fn note_geometry() {
        let drawing = draw(two_notes());
        let seq = drawing.sequence().clone();

        let first = drawing.note_rect(0, &seq.notes()[0]);
        assert_eq!(first, Rect::new(1.0, 48.0 - 2.0 * 6.0, 30.0, 6.0));

        let second = drawing.note_rect(1, &seq.notes()[1]);
        // x = 1 * 30 + 1 * 2, y = 48 - (64 - 58) * 6
        assert_eq!(second, Rect::new(32.0, 12.0, 30.0, 6.0));
    }

    #[test]
    fn opacity_is_uncapped() {
        assert_eq!(opacity(0), 0.2);
        assert_eq!(opacity(100), 1.2);
        assert!(opacity(127) > 1.0);

        let drawing = draw(two_notes());
        let alphas: Vec<_> = drawing.surface().rects().iter().map(|f| f.color.a).collect();
        assert_eq!(alphas, vec![opacity(80), opacity(100)]);
    }

    #[test]
    fn empty_sequence_is_an_error() {
        let seq = Arc::new(NoteSequence::from_notes(vec![]));
        let err = NoteSequenceDrawing::new(seq, DisplayList::new()).unwrap_err();
        assert_eq!(err, RenderError::EmptySequence);
    }

    #[test]
    fn new_sequence_discards_old_pitch_range() {
        let low = Arc::new(NoteSequence::builder().note(0.0, 1.0, 30, 80).build());
        let high = Arc::new(NoteSequence::builder().note(0.0, 1.0, 90, 80).build());

        let drawing = draw(low);
        assert_eq!(drawing.config().min_pitch, 28);

        // Reuse the previous (already derived) config as the seed
        let options = DrawingOptions {
            config: *drawing.config(),
            ..Default::default()
        };
        let drawing = NoteSequenceDrawing::with_options(high, drawing.into_surface(), options)
            .unwrap();
        assert_eq!(drawing.config().min_pitch, 88);
        assert_eq!(drawing.config().max_pitch, 92);
        assert_eq!(drawing.canvas_size().height, 24.0);
    }

    #[test]
    fn redraw_never_leaves_stale_rects() {
        let seq = two_notes();
        let mut drawing = draw(seq.clone());

        for current in [Some(&seq.notes()[0]), Some(&seq.notes()[1]), None, Some(&seq.notes()[0])] {
            drawing.redraw(current);
            assert_eq!(drawing.surface().len(), seq.len());
        }

        let pink = NotePalette::default().current;
        drawing.redraw(Some(&seq.notes()[1]));
        let highlighted: Vec<_> = drawing
            .surface()
            .rects()
            .iter()
            .map(|f| f.color.r == pink.r)
            .collect();
        assert_eq!(highlighted, vec![false, true]);
    }

    #[test]
    fn chord_matches_both_and_later_wins() {
        let seq = Arc::new(
            NoteSequence::builder()
                .note(0.0, 1.0, 60, 100)
                .note(0.0, 1.0, 64, 100)
                .note(1.0, 2.0, 67, 100)
                .build(),
        );
        let mut drawing = draw(seq.clone());

        // Both chord notes share the onset; the second one's x is returned
        let x = drawing.redraw(Some(&seq.notes()[0]));
        assert_eq!(x, Some(2.0));
    }

    #[test]
    fn held_note_contains_current() {
        let held = Note::new(0.0, 4.0, 48, 100);
        let short = Note::new(1.0, 2.0, 60, 100);
        assert!(is_current_note(&held, Some(&short)));
        assert!(!is_current_note(&short, Some(&held)));
        assert!(!is_current_note(&held, None));
    }

    #[test]
    fn later_note_does_not_match_earlier_current() {
        let earlier = Note::new(0.0, 1.0, 60, 100);
        let later = Note::new(1.0, 2.0, 64, 100);
        assert!(!is_current_note(&later, Some(&earlier)));
    }

    #[test]
    fn primer_region_is_inclusive() {
        let seq = Arc::new(
            NoteSequence::builder()
                .note(0.0, 1.0, 60, 100)
                .note(1.0, 2.0, 62, 100)
                .note(2.0, 3.0, 64, 100)
                .build(),
        );
        let options = DrawingOptions {
            primer_notes: Some(1),
            ..Default::default()
        };
        let drawing = NoteSequenceDrawing::with_options(seq, DisplayList::new(), options).unwrap();
        let palette = NotePalette::default();

        let colors: Vec<_> = drawing.surface().rects().iter().map(|f| f.color.r).collect();
        assert_eq!(colors, vec![palette.primer.r, palette.primer.r, palette.base.r]);
        assert_eq!(drawing.rest_color(2), palette.base);
    }

    #[test]
    fn highlight_beats_primer() {
        let seq = Arc::new(NoteSequence::builder().note(0.0, 1.0, 60, 100).build());
        let options = DrawingOptions {
            primer_notes: Some(0),
            ..Default::default()
        };
        let mut drawing =
            NoteSequenceDrawing::with_options(seq.clone(), DisplayList::new(), options).unwrap();
        drawing.redraw(Some(&seq.notes()[0]));
        assert_eq!(drawing.surface().rects()[0].color.r, NotePalette::default().current.r);
    }

    #[test]
    fn paints_into_pixels() {
        let seq = Arc::new(NoteSequence::builder().note(0.0, 1.0, 60, 100).build());
        let drawing = NoteSequenceDrawing::new(seq, PixelBuffer::new()).unwrap();
        let buf = drawing.surface();

        // Canvas is 31 x 24, the note sits at x 1..31, y 12..18
        assert_eq!((buf.width(), buf.height()), (31, 24));
        let base = NotePalette::default().base;
        assert_eq!(buf.pixel(1, 12), Some([base.r, base.g, base.b, 255]));
        assert_eq!(buf.pixel(0, 12), Some([0, 0, 0, 0]));
        assert_eq!(buf.pixel(1, 11), Some([0, 0, 0, 0]));
    }

    #[test]
    fn held_note_past_last_note_is_not_duplicated() {
        // The bass note outlasts the last note, so it sticks out past the canvas
        let seq = Arc::new(
            NoteSequence::builder()
                .note(0.0, 4.0, 48, 80)
                .note(1.0, 2.0, 60, 80)
                .build(),
        );
        let current = seq.notes()[1].clone();
        let mut drawing = draw(seq);
        assert_eq!(drawing.canvas_size().width, 62.0);
        assert_eq!(drawing.surface().len(), 2);

        for _ in 0..5 {
            drawing.redraw(Some(&current));
            assert_eq!(drawing.surface().len(), 2);
        }
    }
}
