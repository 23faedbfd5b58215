use std::path::PathBuf;

use crate::error::{ConversionError, Result};
use crate::ramp::{GlyphRamp, DEFAULT_RAMP};

pub const MIN_GRID_WIDTH: u32 = 20;
pub const MAX_GRID_WIDTH: u32 = 300;
pub const DEFAULT_GRID_WIDTH: u32 = 80;
/// Largest accepted cell width or height, in pixels.
pub const MAX_CELL_SIDE: u32 = 256;

/// Requested grid width in glyph columns, always within
/// [`MIN_GRID_WIDTH`]..=[`MAX_GRID_WIDTH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWidth(u32);

impl GridWidth {
    /// Width of `columns` glyphs; fails outside the accepted range.
    pub fn new(columns: u32) -> Result<Self> {
        if !(MIN_GRID_WIDTH..=MAX_GRID_WIDTH).contains(&columns) {
            return Err(ConversionError::config(format!(
                "grid width must be between {} and {}, got {}",
                MIN_GRID_WIDTH, MAX_GRID_WIDTH, columns
            )));
        }
        Ok(Self(columns))
    }

    /// Parse a command-line width from its leading integer, so `"120abc"`
    /// reads as 120 and `"25.9"` as 25. Text with no leading digits is
    /// reported as out of range.
    pub fn parse(text: &str) -> Result<Self> {
        let columns = leading_integer(text).and_then(|n| u32::try_from(n).ok());
        match columns {
            Some(columns) => Self::new(columns),
            None => Err(ConversionError::config(format!(
                "grid width must be between {} and {}, got {:?}",
                MIN_GRID_WIDTH, MAX_GRID_WIDTH, text
            ))),
        }
    }

    /// Number of glyph columns.
    pub fn get(self) -> u32 {
        self.0
    }
}

fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let value = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

impl Default for GridWidth {
    fn default() -> Self {
        Self(DEFAULT_GRID_WIDTH)
    }
}

/// Pixel size of the rectangle each glyph is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSize {
    pub width: u32,
    pub height: u32,
}

/// One encoder the sink may try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCandidate {
    /// ffmpeg encoder name, e.g. `mpeg4`.
    pub codec: String,
    /// Pixel format handed to the encoder.
    pub pixel_format: String,
}

impl EncoderCandidate {
    /// Candidate for the ffmpeg encoder `codec` fed `pixel_format` frames.
    pub fn new(codec: &str, pixel_format: &str) -> Self {
        Self {
            codec: codec.to_string(),
            pixel_format: pixel_format.to_string(),
        }
    }
}

fn default_encoders() -> Vec<EncoderCandidate> {
    vec![
        EncoderCandidate::new("mpeg4", "yuv420p"),
        EncoderCandidate::new("libx264", "yuv420p"),
    ]
}

/// Settings shared by every frame of a conversion. Built once, never mutated
/// while a conversion runs.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Glyphs from emptiest to densest
    pub ramp: String,
    pub cell: CellSize,
    /// Glyph pixel height as a fraction of the cell height
    pub font_scale: f32,
    /// Distance from the cell's bottom edge up to the glyph baseline
    pub baseline_inset: u32,
    /// Report progress every this many frames
    pub progress_interval: u64,
    /// Tried in order until one opens
    pub encoders: Vec<EncoderCandidate>,
    /// Used when the source does not report a frame rate
    pub fallback_fps: f64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ramp: DEFAULT_RAMP.to_string(),
            cell: CellSize { width: 6, height: 12 },
            font_scale: 0.85,
            baseline_inset: 2,
            progress_interval: 30,
            encoders: default_encoders(),
            fallback_fps: 30.0,
        }
    }
}

impl ConverterConfig {
    /// Set the glyph ramp, emptiest glyph first.
    pub fn with_ramp(mut self, ramp: &str) -> Self {
        self.ramp = ramp.to_string();
        self
    }

    /// Set the pixel size of one glyph cell.
    pub fn with_cell_size(mut self, width: u32, height: u32) -> Self {
        self.cell = CellSize { width, height };
        self
    }

    /// Set glyph height as a fraction of the cell height.
    pub fn with_font_scale(mut self, font_scale: f32) -> Self {
        self.font_scale = font_scale;
        self
    }

    /// Set how far above the cell bottom glyphs sit.
    pub fn with_baseline_inset(mut self, inset: u32) -> Self {
        self.baseline_inset = inset;
        self
    }

    /// Report progress every `frames` frames.
    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames;
        self
    }

    /// Replace the encoder candidates, tried in order.
    pub fn with_encoders(mut self, encoders: Vec<EncoderCandidate>) -> Self {
        self.encoders = encoders;
        self
    }

    /// Set the frame rate used when the source reports none.
    pub fn with_fallback_fps(mut self, fps: f64) -> Self {
        self.fallback_fps = fps;
        self
    }

    /// Check every setting and build the glyph ramp.
    pub fn validate(&self) -> Result<GlyphRamp> {
        let side = 1..=MAX_CELL_SIDE;
        if !side.contains(&self.cell.width) || !side.contains(&self.cell.height) {
            return Err(ConversionError::config(format!(
                "cell size must be between 1x1 and {max}x{max}, got {}x{}",
                self.cell.width,
                self.cell.height,
                max = MAX_CELL_SIDE
            )));
        }
        if !self.font_scale.is_finite() || self.font_scale <= 0.0 {
            return Err(ConversionError::config(format!("font scale must be positive, got {}", self.font_scale)));
        }
        if self.baseline_inset >= self.cell.height {
            return Err(ConversionError::config(format!(
                "baseline inset {} does not fit in a {} px cell",
                self.baseline_inset, self.cell.height
            )));
        }
        if self.progress_interval == 0 {
            return Err(ConversionError::config("progress interval must be at least one frame"));
        }
        if self.encoders.is_empty() {
            return Err(ConversionError::config("at least one encoder candidate is required"));
        }
        if !self.fallback_fps.is_finite() || self.fallback_fps <= 0.0 {
            return Err(ConversionError::config(format!("fallback fps must be positive, got {}", self.fallback_fps)));
        }
        GlyphRamp::new(&self.ramp)
    }
}

/// Where to find the ffmpeg tools.
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_width_bounds_are_inclusive() {
        assert!(GridWidth::new(19).is_err());
        assert_eq!(GridWidth::new(20).unwrap().get(), 20);
        assert_eq!(GridWidth::new(300).unwrap().get(), 300);
        assert!(GridWidth::new(301).is_err());
        assert_eq!(GridWidth::default().get(), 80);
    }

    #[test]
    fn grid_width_parse_rejects_garbage() {
        assert_eq!(GridWidth::parse("120").unwrap().get(), 120);
        assert_eq!(GridWidth::parse(" 42 ").unwrap().get(), 42);
        for bad in ["10", "abc", "-40", "", "99999999999", "1.5", "x120", "+", "-"] {
            assert!(
                matches!(GridWidth::parse(bad), Err(ConversionError::Configuration(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn grid_width_parse_reads_the_leading_integer() {
        assert_eq!(GridWidth::parse("25.9").unwrap().get(), 25);
        assert_eq!(GridWidth::parse("120abc").unwrap().get(), 120);
        assert_eq!(GridWidth::parse("+60").unwrap().get(), 60);
        assert!(GridWidth::parse("301px").is_err());
    }

    #[test]
    fn default_config_validates() {
        let ramp = ConverterConfig::default().validate().unwrap();
        assert_eq!(ramp.len(), 70);
    }

    #[test]
    fn validate_catches_each_bad_setting() {
        let base = ConverterConfig::default;
        assert!(base().with_cell_size(0, 12).validate().is_err());
        assert!(base().with_cell_size(6, 0).validate().is_err());
        assert!(base().with_cell_size(60000, 60000).validate().is_err());
        assert!(base().with_cell_size(MAX_CELL_SIDE + 1, 12).validate().is_err());
        assert!(base().with_cell_size(MAX_CELL_SIDE, MAX_CELL_SIDE).validate().is_ok());
        assert!(base().with_font_scale(0.0).validate().is_err());
        assert!(base().with_font_scale(f32::NAN).validate().is_err());
        assert!(base().with_baseline_inset(12).validate().is_err());
        assert!(base().with_progress_interval(0).validate().is_err());
        assert!(base().with_encoders(Vec::new()).validate().is_err());
        assert!(base().with_fallback_fps(0.0).validate().is_err());
        assert!(base().with_ramp("x").validate().is_err());
    }
}
