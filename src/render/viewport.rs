/// Pixels of already-played roll kept visible to the left of a note the
/// viewport jumps to
pub const LOOKAHEAD_MARGIN: f64 = 20.0;

/// Horizontal window onto a piano roll wider than the screen
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Left edge of the visible span, in canvas pixels
    pub scroll_left: f64,
    /// Visible width, in canvas pixels
    pub width: f64,
}

impl Viewport {
    pub fn new(width: f64) -> Self {
        Self {
            scroll_left: 0.0,
            width,
        }
    }

    /// Keep the highlighted note in view
    ///
    /// Only scrolls once the note's left edge has moved past the right side
    /// of the window; it then lands `LOOKAHEAD_MARGIN` pixels from the left.
    /// Returns whether the scroll position changed.
    pub fn follow(&mut self, note_x: f64) -> bool {
        if note_x > self.scroll_left + self.width {
            self.scroll_left = note_x - LOOKAHEAD_MARGIN;
            true
        } else {
            false
        }
    }

    /// Scroll by `dx` pixels, staying within `[0, content_width - width]`
    pub fn scroll_by(&mut self, dx: f64, content_width: f64) {
        let max = (content_width - self.width).max(0.0);
        self.scroll_left = (self.scroll_left + dx).clamp(0.0, max);
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    /// Back to the start, e.g. when a new sequence loads
    pub fn reset(&mut self) {
        self.scroll_left = 0.0;
    }

    /// Visible span `[left, right)`
    pub fn span(&self) -> (f64, f64) {
        (self.scroll_left, self.scroll_left + self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_scroll_while_note_is_visible() {
        let mut vp = Viewport::new(100.0);
        assert!(!vp.follow(50.0));
        assert!(!vp.follow(100.0));
        assert_eq!(vp.scroll_left, 0.0);
    }

    #[test]
    fn jumps_with_margin_once_past_right_edge() {
        let mut vp = Viewport::new(100.0);
        assert!(vp.follow(151.0));
        assert_eq!(vp.scroll_left, 131.0);
        assert_eq!(vp.span(), (131.0, 231.0));
    }

    #[test]
    fn does_not_scroll_back_for_earlier_notes() {
        let mut vp = Viewport::new(100.0);
        vp.follow(300.0);
        assert!(!vp.follow(10.0));
        assert_eq!(vp.scroll_left, 280.0);
    }

    #[test]
    fn manual_scroll_is_clamped() {
        let mut vp = Viewport::new(100.0);
        vp.scroll_by(-10.0, 500.0);
        assert_eq!(vp.scroll_left, 0.0);
        vp.scroll_by(1000.0, 500.0);
        assert_eq!(vp.scroll_left, 400.0);

        // Content narrower than the window never scrolls
        vp.scroll_by(50.0, 80.0);
        assert_eq!(vp.scroll_left, 0.0);
    }

    #[test]
    fn reset_returns_to_start() {
        let mut vp = Viewport::new(100.0);
        vp.follow(500.0);
        vp.reset();
        assert_eq!(vp.scroll_left, 0.0);
        assert_eq!(vp.width, 100.0);
    }
}
