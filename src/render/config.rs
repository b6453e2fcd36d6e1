#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::surface::Rgba;

/// Geometry of the piano roll
///
/// `min_pitch`/`max_pitch` are derived from each loaded sequence; the values
/// here are only the seeds the drawing starts from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// Height of one semitone row, in pixels
    pub note_height: f64,
    /// Horizontal nudge added per note index, in pixels
    pub note_spacing: f64,
    /// Horizontal scale, in pixels per second (bigger = wider notes)
    pub pixels_per_time_step: f64,
    /// Lowest pitch row (after padding)
    pub min_pitch: i32,
    /// Highest pitch row (after padding)
    pub max_pitch: i32,
}

impl RenderConfig {
    /// Semitones of empty space above and below the used pitch range
    pub const PITCH_PADDING: i32 = 2;
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            note_height: 6.0,
            note_spacing: 1.0,
            pixels_per_time_step: 30.0,
            min_pitch: 100,
            max_pitch: 1,
        }
    }
}

/// An opaque RGB color
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Attach an opacity; values above 1.0 are kept as-is
    pub fn with_opacity(self, a: f64) -> Rgba {
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }
}

/// Fill colors by note role
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotePalette {
    /// The note currently sounding
    pub current: Rgb,
    /// Notes in the primer region
    pub primer: Rgb,
    /// Everything else
    pub base: Rgb,
}

impl Default for NotePalette {
    fn default() -> Self {
        Self {
            current: Rgb::new(240, 84, 119), // pink
            primer: Rgb::new(111, 201, 198), // teal
            base: Rgb::new(8, 41, 64),       // dark blue
        }
    }
}
