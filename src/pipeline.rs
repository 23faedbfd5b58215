use std::path::Path;

use crate::config::{ConverterConfig, GridWidth};
use crate::downsample::area_downsample;
use crate::error::{ConversionError, Result};
use crate::luminance::LuminanceModel;
use crate::progress::Progress;
use crate::raster::{FrameRasterizer, GlyphPainter, GridCell};
use crate::video::{StreamInfo, VideoBackend, VideoSink, VideoSource};

/// Largest rendered frame, in `rgb24` bytes, a conversion will allocate.
pub const MAX_CANVAS_BYTES: u64 = 1 << 30;

/// Lifecycle of one `convert` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    SourceOpened,
    SinkOpened,
    Streaming,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle, SourceOpened) | (SourceOpened, SinkOpened) | (SinkOpened, Streaming) | (Streaming, Closed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Per-run state, created when a conversion starts and dropped when it ends.
#[derive(Debug, Clone)]
pub struct ConversionSession {
    pub state: SessionState,
    pub source: Option<StreamInfo>,
    pub frame_rate: f64,
    pub grid_width: u32,
    pub grid_height: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub encoder: Option<String>,
    pub processed: u64,
}

impl ConversionSession {
    fn new(grid_width: GridWidth) -> Self {
        Self {
            state: SessionState::Idle,
            source: None,
            frame_rate: 0.0,
            grid_width: grid_width.get(),
            grid_height: 0,
            output_width: 0,
            output_height: 0,
            encoder: None,
            processed: 0,
        }
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal session transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Known total frame count; a reported count of zero means unknown.
    pub fn total_frames(&self) -> Option<u64> {
        self.source.and_then(|s| s.frame_count).filter(|&n| n > 0)
    }

    fn summary(&self, glyph_count: usize) -> String {
        let (width, height) = self.source.map(|s| (s.width, s.height)).unwrap_or_default();
        let total = self.total_frames().map_or_else(|| "unknown".to_string(), |n| n.to_string());
        format!(
            "Video info: {}x{}, {:.2} fps, {} frames\nOutput size: {}x{}\nASCII grid: {}x{} glyphs\nGlyph ramp: {} glyphs\nEncoder: {}",
            width,
            height,
            self.frame_rate,
            total,
            self.output_width,
            self.output_height,
            self.grid_width,
            self.grid_height,
            glyph_count,
            self.encoder.as_deref().unwrap_or("none")
        )
    }
}

/// One cell as it was classified, handed to the debug tracer.
#[derive(Debug, Clone, Copy)]
pub struct CellTrace {
    /// Zero-based frame index
    pub frame: u64,
    pub cell: GridCell,
}

/// Grid rows for a `grid_width`-column rendering of a source frame:
/// `floor(grid_width * height / width * 0.5)`. Glyph cells are about twice
/// as tall as wide, so halving keeps the picture's aspect ratio.
pub fn grid_height(grid_width: u32, source_width: u32, source_height: u32) -> u32 {
    if source_width == 0 {
        return 0;
    }
    let rows = u64::from(grid_width) * u64::from(source_height) / (2 * u64::from(source_width));
    u32::try_from(rows).unwrap_or(u32::MAX)
}

/// Decodes, re-renders and encodes a video, one frame at a time.
pub struct Pipeline<B, P> {
    config: ConverterConfig,
    backend: B,
    rasterizer: FrameRasterizer<P>,
    tracer: Option<Box<dyn FnMut(&CellTrace)>>,
}

impl<B: VideoBackend, P: GlyphPainter> Pipeline<B, P> {
    /// Validates `config` before anything is opened.
    pub fn new(config: ConverterConfig, backend: B, painter: P) -> Result<Self> {
        let ramp = config.validate()?;
        let rasterizer = FrameRasterizer::new(ramp, LuminanceModel::REC601, &config, painter);
        Ok(Self {
            config,
            backend,
            rasterizer,
            tracer: None,
        })
    }

    /// Install a callback that sees every classified cell of every frame.
    pub fn with_cell_trace<F>(mut self, tracer: F) -> Self
    where
        F: FnMut(&CellTrace) + 'static,
    {
        self.tracer = Some(Box::new(tracer));
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn rasterizer(&self) -> &FrameRasterizer<P> {
        &self.rasterizer
    }

    /// Convert `source_path` into `sink_path`, returning the number of frames
    /// written. Source and sink are released on every path out of here,
    /// successful or not. A partially written output is left in place.
    pub fn convert<F>(&mut self, source_path: &Path, sink_path: &Path, grid_width: GridWidth, mut on_progress: F) -> Result<u64>
    where
        F: FnMut(Progress),
    {
        let mut session = ConversionSession::new(grid_width);

        let mut source = match self.backend.open_source(source_path) {
            Ok(source) => source,
            Err(e) => {
                session.advance(SessionState::Failed);
                return Err(ConversionError::SourceOpen {
                    path: source_path.to_path_buf(),
                    reason: format!("{:#}", e),
                });
            }
        };
        session.advance(SessionState::SourceOpened);

        let streamed = self.stream_from(&mut session, &mut source, source_path, sink_path, &mut on_progress);
        let released = source.release();

        let outcome = match (streamed, released) {
            (Ok(frames), Ok(())) => Ok(frames),
            (Ok(_), Err(e)) => Err(ConversionError::FrameDecode {
                frame: session.processed,
                reason: format!("releasing source: {:#}", e),
            }),
            (Err(e), _) => Err(e),
        };

        match outcome {
            Ok(frames) => {
                session.advance(SessionState::Closed);
                on_progress(Progress::complete(frames, session.total_frames()));
                Ok(frames)
            }
            Err(e) => {
                session.advance(SessionState::Failed);
                Err(e)
            }
        }
    }

    fn stream_from<F>(
        &mut self,
        session: &mut ConversionSession,
        source: &mut B::Source,
        source_path: &Path,
        sink_path: &Path,
        on_progress: &mut F,
    ) -> Result<u64>
    where
        F: FnMut(Progress),
    {
        let info = source.info();
        if info.width == 0 || info.height == 0 {
            return Err(ConversionError::SourceOpen {
                path: source_path.to_path_buf(),
                reason: format!("source reports zero dimensions ({}x{})", info.width, info.height),
            });
        }
        session.source = Some(info);
        session.frame_rate = if info.frame_rate.is_finite() && info.frame_rate > 0.0 {
            info.frame_rate
        } else {
            self.config.fallback_fps
        };

        let invalid = || ConversionError::InvalidDimensions {
            grid_width: session.grid_width,
            source_width: info.width,
            source_height: info.height,
        };
        let rows = grid_height(session.grid_width, info.width, info.height);
        if rows == 0 {
            return Err(invalid());
        }
        let cell = self.config.cell;
        let (output_width, output_height) = match (
            session.grid_width.checked_mul(cell.width),
            rows.checked_mul(cell.height),
        ) {
            (Some(w), Some(h)) => (w, h),
            _ => return Err(invalid()),
        };
        if u64::from(output_width) * u64::from(output_height) * 3 > MAX_CANVAS_BYTES {
            return Err(invalid());
        }
        session.grid_height = rows;
        session.output_width = output_width;
        session.output_height = output_height;

        let mut sink = self.open_sink(session, sink_path)?;
        session.advance(SessionState::SinkOpened);
        on_progress(Progress::opened(
            session.total_frames(),
            session.summary(self.rasterizer.ramp().len()),
        ));

        let streamed = self.stream(session, source, &mut sink, on_progress);
        let released = sink.release();

        match (streamed, released) {
            (Ok(frames), Ok(())) => Ok(frames),
            (Ok(frames), Err(e)) => Err(ConversionError::FrameEncode {
                frame: frames,
                reason: format!("finishing output: {:#}", e),
            }),
            (Err(e), _) => Err(e),
        }
    }

    /// Try each encoder candidate in order; the first that opens wins.
    fn open_sink(&mut self, session: &mut ConversionSession, sink_path: &Path) -> Result<B::Sink> {
        let mut tried = Vec::with_capacity(self.config.encoders.len());
        for encoder in &self.config.encoders {
            match self.backend.open_sink(
                sink_path,
                encoder,
                session.frame_rate,
                session.output_width,
                session.output_height,
            ) {
                Ok(sink) => {
                    session.encoder = Some(encoder.codec.clone());
                    return Ok(sink);
                }
                Err(e) => tried.push(format!("{} ({:#})", encoder.codec, e)),
            }
        }
        Err(ConversionError::SinkOpen {
            path: sink_path.to_path_buf(),
            tried,
        })
    }

    fn stream<F>(&mut self, session: &mut ConversionSession, source: &mut B::Source, sink: &mut B::Sink, on_progress: &mut F) -> Result<u64>
    where
        F: FnMut(Progress),
    {
        session.advance(SessionState::Streaming);
        let total = session.total_frames();

        loop {
            let frame_index = session.processed;
            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    return Err(ConversionError::FrameDecode {
                        frame: frame_index,
                        reason: format!("{:#}", e),
                    })
                }
            };

            let grid = area_downsample(&frame, session.grid_width, session.grid_height);
            let canvas = match self.tracer.as_mut() {
                Some(tracer) => self
                    .rasterizer
                    .rasterize_traced(&grid, |cell| tracer(&CellTrace { frame: frame_index, cell: *cell })),
                None => self.rasterizer.rasterize(&grid),
            };

            sink.write_frame(&canvas).map_err(|e| ConversionError::FrameEncode {
                frame: frame_index,
                reason: format!("{:#}", e),
            })?;

            session.processed += 1;
            if session.processed % self.config.progress_interval == 0 {
                on_progress(Progress::converting(session.processed, total));
            }
        }

        Ok(session.processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn grid_height_halves_the_aspect_ratio() {
        assert_eq!(grid_height(80, 1920, 1080), 22);
        assert_eq!(grid_height(120, 640, 480), 45);
        assert_eq!(grid_height(2, 2, 4), 2);
        assert_eq!(grid_height(2, 2, 2), 1);
    }

    #[test]
    fn grid_height_collapses_for_very_wide_sources() {
        assert_eq!(grid_height(20, 1000, 10), 0);
        assert_eq!(grid_height(20, 0, 10), 0);
    }

    #[test]
    fn grid_height_matches_truncating_formula() {
        for (gw, w, h) in [(80, 1280, 720), (33, 7, 5), (300, 1, 1), (21, 640, 2)] {
            let expected = ((gw * h / w) as f64 * 0.5) as u32;
            assert_eq!(grid_height(gw, w, h), expected, "{} {} {}", gw, w, h);
        }
    }

    #[test]
    fn happy_path_transitions_are_allowed() {
        let path = [Idle, SourceOpened, SinkOpened, Streaming, Closed];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn any_live_state_can_fail() {
        for state in [Idle, SourceOpened, SinkOpened, Streaming] {
            assert!(state.can_advance_to(Failed));
        }
        assert!(!Closed.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Failed));
    }

    #[test]
    fn skipping_states_is_illegal() {
        assert!(!Idle.can_advance_to(Streaming));
        assert!(!SourceOpened.can_advance_to(Closed));
        assert!(!Closed.can_advance_to(Idle));
    }

    #[test]
    fn summary_lists_run_metadata() {
        let mut session = ConversionSession::new(GridWidth::new(80).unwrap());
        session.source = Some(StreamInfo { width: 1920, height: 1080, frame_rate: 30.0, frame_count: None });
        session.frame_rate = 30.0;
        session.grid_height = 22;
        session.output_width = 480;
        session.output_height = 264;
        session.encoder = Some("mpeg4".into());
        let summary = session.summary(70);
        assert!(summary.contains("1920x1080, 30.00 fps, unknown frames"));
        assert!(summary.contains("Output size: 480x264"));
        assert!(summary.contains("ASCII grid: 80x22 glyphs"));
        assert!(summary.contains("Glyph ramp: 70 glyphs"));
    }
}
