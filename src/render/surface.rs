use std::io::{self, Write};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width and height of a drawing surface, in pixels
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned rectangle; y grows downward
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Whether `other` lies entirely inside this rectangle
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlap of the two rectangles, or `None` if they don't overlap
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| Rect::new(x, y, right - x, bottom - y))
    }
}

/// Color with an opacity
///
/// `a` is not clamped: a velocity-derived opacity can exceed 1.0. Surfaces
/// that composite pixels clamp at blend time.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

/// Something the piano roll can be painted onto
pub trait DrawingSurface {
    /// Resize the surface; contents are discarded
    fn resize(&mut self, width: f64, height: f64);

    fn size(&self) -> CanvasSize;

    /// Erase everything inside `rect`
    fn clear_rect(&mut self, rect: Rect);

    fn fill_rect(&mut self, rect: Rect, color: Rgba);

    /// Erase the whole surface
    fn clear(&mut self) {
        let size = self.size();
        self.clear_rect(Rect::new(0.0, 0.0, size.width, size.height));
    }
}

/// One painted rectangle in a [`DisplayList`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilledRect {
    pub rect: Rect,
    pub color: Rgba,
}

/// Surface that records fills instead of rasterizing them
///
/// Used by the terminal front-end, which re-projects rectangles onto its
/// own grid, and by tests that inspect exactly what was painted.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    size: CanvasSize,
    rects: Vec<FilledRect>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rectangles in paint order
    pub fn rects(&self) -> &[FilledRect] {
        &self.rects
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Rectangles that intersect the horizontal span `[left, right)`
    pub fn visible(&self, left: f64, right: f64) -> impl Iterator<Item = &FilledRect> {
        self.rects
            .iter()
            .filter(move |f| f.rect.right() > left && f.rect.x < right)
    }
}

impl DrawingSurface for DisplayList {
    fn resize(&mut self, width: f64, height: f64) {
        self.size = CanvasSize { width, height };
        self.rects.clear();
    }

    fn size(&self) -> CanvasSize {
        self.size
    }

    fn clear_rect(&mut self, rect: Rect) {
        // Only the on-canvas part of a fill counts, as if it had been clipped
        // when painted. Partially covered fills stay; there are no pixels to cut.
        let canvas = Rect::new(0.0, 0.0, self.size.width, self.size.height);
        self.rects.retain(|f| {
            canvas
                .intersection(&f.rect)
                .is_some_and(|painted| !rect.contains(&painted))
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        self.rects.push(FilledRect { rect, color });
    }

    fn clear(&mut self) {
        self.rects.clear();
    }
}

/// RGBA8 raster with source-over blending
#[derive(Debug, Clone, Default)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    size: CanvasSize,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA bytes, row-major
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGBA at a pixel, or `None` outside the buffer
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Write as binary PPM, compositing onto a white background
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        let mut row = Vec::with_capacity(self.width * 3);
        for y in 0..self.height {
            row.clear();
            for px in self.data[y * self.width * 4..(y + 1) * self.width * 4].chunks_exact(4) {
                let a = px[3] as f32 / 255.0;
                for &c in &px[..3] {
                    row.push((c as f32 * a + 255.0 * (1.0 - a)).round() as u8);
                }
            }
            out.write_all(&row)?;
        }
        Ok(())
    }

    /// Pixel index span covered by `[start, start + len)`, sampling pixel centers
    fn span(start: f64, len: f64, limit: usize) -> (usize, usize) {
        let first = (start - 0.5).ceil().max(0.0);
        let last = (start + len - 0.5).ceil().max(0.0);
        (
            (first as usize).min(limit),
            (last as usize).min(limit),
        )
    }
}

impl DrawingSurface for PixelBuffer {
    fn resize(&mut self, width: f64, height: f64) {
        self.size = CanvasSize { width, height };
        self.width = width.max(0.0).ceil() as usize;
        self.height = height.max(0.0).ceil() as usize;
        self.data = vec![0; self.width * self.height * 4];
    }

    fn size(&self) -> CanvasSize {
        self.size
    }

    fn clear_rect(&mut self, rect: Rect) {
        let (x0, x1) = Self::span(rect.x, rect.w, self.width);
        let (y0, y1) = Self::span(rect.y, rect.h, self.height);
        for y in y0..y1 {
            let row = y * self.width * 4;
            self.data[row + x0 * 4..row + x1 * 4].fill(0);
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let a = color.a.clamp(0.0, 1.0) as f32;
        if a == 0.0 {
            return;
        }
        let src = [color.r as f32, color.g as f32, color.b as f32];

        let (x0, x1) = Self::span(rect.x, rect.w, self.width);
        let (y0, y1) = Self::span(rect.y, rect.h, self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let i = (y * self.width + x) * 4;
                let dst_a = self.data[i + 3] as f32 / 255.0;
                let out_a = a + dst_a * (1.0 - a);
                for c in 0..3 {
                    let dst = self.data[i + c] as f32;
                    let blended = (src[c] * a + dst * dst_a * (1.0 - a)) / out_a;
                    self.data[i + c] = blended.round().clamp(0.0, 255.0) as u8;
                }
                self.data[i + 3] = (out_a * 255.0).round() as u8;
            }
        }
    }
}
