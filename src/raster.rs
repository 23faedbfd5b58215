use image::{Rgb, RgbImage};

use crate::config::{CellSize, ConverterConfig};
use crate::luminance::{Brightness, ColorSample, LuminanceModel};
use crate::ramp::GlyphRamp;

/// A rendered frame: `grid_width * cell.width` by `grid_height * cell.height`.
pub type Canvas = RgbImage;

pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// One down-sampled grid position and the glyph chosen for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub column: u32,
    pub row: u32,
    pub color: Rgb<u8>,
    pub brightness: Brightness,
    pub glyph: char,
}

/// Screen rectangle a single glyph is drawn into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphSlot {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Canvas row of the glyph baseline
    pub baseline: u32,
    /// Glyph height in pixels
    pub px_height: f32,
}

/// Draws one glyph into one slot. Implementations may bleed a little past the
/// slot through anti-aliasing but must not otherwise touch other slots.
pub trait GlyphPainter {
    fn paint(&mut self, canvas: &mut Canvas, glyph: char, slot: &GlyphSlot, color: Rgb<u8>);
}

impl<P: GlyphPainter + ?Sized> GlyphPainter for Box<P> {
    fn paint(&mut self, canvas: &mut Canvas, glyph: char, slot: &GlyphSlot, color: Rgb<u8>) {
        (**self).paint(canvas, glyph, slot, color)
    }
}

impl<P: GlyphPainter + ?Sized> GlyphPainter for &mut P {
    fn paint(&mut self, canvas: &mut Canvas, glyph: char, slot: &GlyphSlot, color: Rgb<u8>) {
        (**self).paint(canvas, glyph, slot, color)
    }
}

/// Alpha-blend `color` over the canvas pixel at (`x`, `y`) with the given
/// coverage. Coordinates outside the canvas are ignored.
pub fn blend_coverage(canvas: &mut Canvas, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0);
    if alpha == 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let mixed = f32::from(color[channel]) * alpha + f32::from(dst[channel]) * (1.0 - alpha);
        dst[channel] = mixed.round().clamp(0.0, 255.0) as u8;
    }
}

#[derive(Debug, Clone, Copy)]
struct CellGeometry {
    cell: CellSize,
    font_scale: f32,
    baseline_inset: u32,
}

impl CellGeometry {
    fn slot(&self, column: u32, row: u32) -> GlyphSlot {
        let x = column * self.cell.width;
        let y = row * self.cell.height;
        GlyphSlot {
            x,
            y,
            width: self.cell.width,
            height: self.cell.height,
            baseline: y + self.cell.height - self.baseline_inset,
            px_height: self.cell.height as f32 * self.font_scale,
        }
    }
}

fn classify(ramp: &GlyphRamp, model: &LuminanceModel, column: u32, row: u32, color: Rgb<u8>) -> GridCell {
    let brightness = model.brightness_of(ColorSample::from(color));
    GridCell {
        column,
        row,
        color,
        brightness,
        glyph: ramp.glyph_for(brightness),
    }
}

/// Turns a down-sampled color grid into a canvas of colored glyphs.
pub struct FrameRasterizer<P> {
    ramp: GlyphRamp,
    model: LuminanceModel,
    geometry: CellGeometry,
    painter: P,
}

impl<P: GlyphPainter> FrameRasterizer<P> {
    /// `config` is expected to be validated already.
    pub fn new(ramp: GlyphRamp, model: LuminanceModel, config: &ConverterConfig, painter: P) -> Self {
        Self {
            ramp,
            model,
            geometry: CellGeometry {
                cell: config.cell,
                font_scale: config.font_scale,
                baseline_inset: config.baseline_inset,
            },
            painter,
        }
    }

    pub fn ramp(&self) -> &GlyphRamp {
        &self.ramp
    }

    pub fn painter(&self) -> &P {
        &self.painter
    }

    pub fn canvas_size(&self, grid_width: u32, grid_height: u32) -> (u32, u32) {
        (grid_width * self.geometry.cell.width, grid_height * self.geometry.cell.height)
    }

    /// Glyph choices for every cell of `grid`, row-major.
    pub fn cells<'a>(&'a self, grid: &'a RgbImage) -> impl Iterator<Item = GridCell> + 'a {
        grid.enumerate_pixels()
            .map(move |(x, y, px)| classify(&self.ramp, &self.model, x, y, *px))
    }

    pub fn rasterize(&mut self, grid: &RgbImage) -> Canvas {
        self.rasterize_traced(grid, |_| {})
    }

    /// Like [`rasterize`](Self::rasterize), handing each cell to `trace`
    /// before it is drawn.
    pub fn rasterize_traced<F>(&mut self, grid: &RgbImage, mut trace: F) -> Canvas
    where
        F: FnMut(&GridCell),
    {
        let (width, height) = self.canvas_size(grid.width(), grid.height());
        let mut canvas = Canvas::from_pixel(width, height, BACKGROUND);
        for (x, y, px) in grid.enumerate_pixels() {
            let cell = classify(&self.ramp, &self.model, x, y, *px);
            trace(&cell);
            let slot = self.geometry.slot(x, y);
            self.painter.paint(&mut canvas, cell.glyph, &slot, cell.color);
        }
        canvas
    }
}
