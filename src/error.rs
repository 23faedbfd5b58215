use std::path::PathBuf;

/// Everything that can stop a conversion. None of these are retried: a
/// single failing frame aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("cannot open source {}: {reason}", .path.display())]
    SourceOpen { path: PathBuf, reason: String },

    #[error("cannot open output {} with any encoder (tried {})", .path.display(), .tried.join(", "))]
    SinkOpen { path: PathBuf, tried: Vec<String> },

    #[error("a {grid_width}-column grid of a {source_width}x{source_height} source has no rows or is too large to render")]
    InvalidDimensions {
        grid_width: u32,
        source_width: u32,
        source_height: u32,
    },

    #[error("failed to decode frame {frame}: {reason}")]
    FrameDecode { frame: u64, reason: String },

    #[error("failed to encode frame {frame}: {reason}")]
    FrameEncode { frame: u64, reason: String },
}

impl ConversionError {
    pub(crate) fn config<S: Into<String>>(message: S) -> Self {
        ConversionError::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_open_lists_every_tried_encoder() {
        let err = ConversionError::SinkOpen {
            path: PathBuf::from("out.mp4"),
            tried: vec!["mpeg4".into(), "libx264".into()],
        };
        assert_eq!(err.to_string(), "cannot open output out.mp4 with any encoder (tried mpeg4, libx264)");
    }

    #[test]
    fn invalid_dimensions_names_the_source_size() {
        let err = ConversionError::InvalidDimensions { grid_width: 20, source_width: 1000, source_height: 10 };
        assert!(err.to_string().contains("1000x10"));
    }
}
