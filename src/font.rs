use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontVec, PxScale};
use image::Rgb;

use crate::error::{ConversionError, Result};
use crate::raster::{blend_coverage, Canvas, GlyphPainter, GlyphSlot};

/// Monospace fonts looked for when no font is given explicitly.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu-sans-mono-fonts/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation-mono/LiberationMono-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeMono.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "/Library/Fonts/Courier New.ttf",
    "C:\\Windows\\Fonts\\consola.ttf",
    "C:\\Windows\\Fonts\\cour.ttf",
];

/// Coverage of one glyph rendered with its origin at (0, 0).
#[derive(Debug, Clone)]
struct GlyphMask {
    left: i32,
    top: i32,
    width: u32,
    coverage: Vec<f32>,
}

/// Paints glyphs from a TrueType/OpenType font, anti-aliased.
///
/// Output is deterministic for a given font file. Two different fonts (or
/// versions of one) produce different pixels for the same glyph choices.
pub struct FontPainter {
    font: FontVec,
    path: PathBuf,
    cache: HashMap<(char, u32), Option<GlyphMask>>,
}

impl FontPainter {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|e| ConversionError::config(format!("cannot read font {}: {}", path.display(), e)))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| ConversionError::config(format!("cannot parse font {}: {}", path.display(), e)))?;
        Ok(Self {
            font,
            path: path.to_path_buf(),
            cache: HashMap::new(),
        })
    }

    /// Load the first readable font from [`SYSTEM_FONT_CANDIDATES`].
    pub fn discover() -> Result<Self> {
        SYSTEM_FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .filter(|p| p.is_file())
            .find_map(|p| Self::from_path(p).ok())
            .ok_or_else(|| ConversionError::config("no monospace system font found; pass one with --font"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mask(&mut self, glyph: char, px_height: f32) -> Option<&GlyphMask> {
        let font = &self.font;
        self.cache
            .entry((glyph, px_height.to_bits()))
            .or_insert_with(|| {
                let positioned = font
                    .glyph_id(glyph)
                    .with_scale_and_position(PxScale::from(px_height), point(0.0, 0.0));
                let outlined = font.outline_glyph(positioned)?;
                let bounds = outlined.px_bounds();
                let width = bounds.width() as u32;
                let height = bounds.height() as u32;
                let mut coverage = vec![0f32; (width * height) as usize];
                outlined.draw(|x, y, c| {
                    if x < width && y < height {
                        coverage[(y * width + x) as usize] = c;
                    }
                });
                Some(GlyphMask {
                    left: bounds.min.x as i32,
                    top: bounds.min.y as i32,
                    width,
                    coverage,
                })
            })
            .as_ref()
    }
}

impl GlyphPainter for FontPainter {
    fn paint(&mut self, canvas: &mut Canvas, glyph: char, slot: &GlyphSlot, color: Rgb<u8>) {
        let Some(mask) = self.mask(glyph, slot.px_height) else {
            return;
        };
        if mask.width == 0 {
            return;
        }
        let origin_x = slot.x as i32 + mask.left;
        let origin_y = slot.baseline as i32 + mask.top;
        for (i, &c) in mask.coverage.iter().enumerate() {
            let dx = (i as u32 % mask.width) as i32;
            let dy = (i as u32 / mask.width) as i32;
            blend_coverage(canvas, origin_x + dx, origin_y + dy, color, c);
        }
    }
}
