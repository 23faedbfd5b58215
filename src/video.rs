//! The video I/O boundary. The pipeline only talks to these traits; the
//! default implementation lives in [`crate::ffmpeg`].

use std::path::Path;

use anyhow::Result;
use image::RgbImage;

use crate::config::EncoderCandidate;

/// What a source reports about its video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second; 0 when the container does not say
    pub frame_rate: f64,
    /// `None` when the container does not know
    pub frame_count: Option<u64>,
}

/// Sequential reader of decoded frames, red-green-blue order.
pub trait VideoSource {
    fn info(&self) -> StreamInfo;

    /// Next frame, or `None` once the stream has ended.
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Free the decoder. Called exactly once, on every exit path.
    fn release(&mut self) -> Result<()>;
}

/// Sequential writer of rendered frames.
pub trait VideoSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and close the output. Called exactly once, on every exit path.
    fn release(&mut self) -> Result<()>;
}

/// Opens sources and sinks.
pub trait VideoBackend {
    type Source: VideoSource;
    type Sink: VideoSink;

    fn open_source(&mut self, path: &Path) -> Result<Self::Source>;

    /// Fails if `encoder` is not usable; the caller moves on to the next
    /// candidate.
    fn open_sink(
        &mut self,
        path: &Path,
        encoder: &EncoderCandidate,
        frame_rate: f64,
        width: u32,
        height: u32,
    ) -> Result<Self::Sink>;
}
