//! # vascii - colored ASCII video converter
//!
//! `vascii` re-renders every frame of a video as character art: each frame is
//! area-averaged down to a grid, each grid cell becomes one glyph picked by
//! brightness from a dark-to-light ramp, and the glyph is drawn in the cell's
//! original color.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use vascii::{ConverterConfig, FfmpegBackend, FontPainter, GridWidth, Pipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let painter = FontPainter::discover()?;
//! let mut pipeline = Pipeline::new(ConverterConfig::default(), FfmpegBackend::default(), painter)?;
//! let frames = pipeline.convert(
//!     Path::new("input.mp4"),
//!     Path::new("ascii.mp4"),
//!     GridWidth::new(120)?,
//!     |progress| println!("{}", progress.message),
//! )?;
//! println!("wrote {} frames", frames);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom I/O
//!
//! The pipeline only needs a [`VideoBackend`]; anything that can hand out
//! decoded `rgb24` frames and accept rendered ones can replace
//! [`FfmpegBackend`]. Likewise any [`GlyphPainter`] can replace
//! [`FontPainter`].

pub mod config;
pub mod downsample;
pub mod error;
pub mod ffmpeg;
pub mod font;
pub mod luminance;
pub mod pipeline;
pub mod progress;
pub mod ramp;
pub mod raster;
pub mod video;

pub use config::{CellSize, ConverterConfig, EncoderCandidate, FfmpegConfig, GridWidth};
pub use downsample::area_downsample;
pub use error::ConversionError;
pub use ffmpeg::{FfmpegBackend, FfmpegSink, FfmpegSource};
pub use font::FontPainter;
pub use luminance::{Brightness, ColorSample, LuminanceModel};
pub use pipeline::{grid_height, CellTrace, MAX_CANVAS_BYTES, ConversionSession, Pipeline, SessionState};
pub use progress::{Progress, ProgressPhase};
pub use ramp::{GlyphRamp, DEFAULT_RAMP};
pub use raster::{Canvas, FrameRasterizer, GlyphPainter, GlyphSlot, GridCell};
pub use video::{StreamInfo, VideoBackend, VideoSink, VideoSource};
