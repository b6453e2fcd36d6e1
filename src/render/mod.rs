//! Piano-roll rendering.
//!
//! The renderer paints a [`NoteSequence`](crate::sequencing::NoteSequence)
//! onto any [`DrawingSurface`]: notes become rectangles positioned by time
//! (x) and pitch (y), and the note currently sounding is highlighted.

/// Note geometry constants and colors.
pub mod config;
/// Sizing and painting a note sequence.
pub mod drawing;
/// Drawing surfaces: a recorded display list and an RGBA raster.
pub mod surface;
/// Horizontal scroll state that follows the highlighted note.
pub mod viewport;

pub use config::{NotePalette, RenderConfig, Rgb};
pub use drawing::{is_current_note, opacity, DrawingOptions, NoteSequenceDrawing};
pub use surface::{CanvasSize, DisplayList, DrawingSurface, FilledRect, PixelBuffer, Rect, Rgba};
pub use viewport::Viewport;
