#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use image::Rgb;
use tempfile::tempdir;
use vascii::{
    Canvas, ConversionError, ConverterConfig, EncoderCandidate, FfmpegBackend, FfmpegConfig, GlyphPainter, GlyphSlot,
    GridWidth, Pipeline, ProgressPhase, VideoBackend, VideoSink,
};

/// Lists both encoders, but mpeg4 dies after starting, the way ffmpeg does
/// when the container cannot hold the codec. Decoding yields no frames.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
for arg in "$@"; do
  if [ "$arg" = "-encoders" ]; then
    printf 'Encoders:\n V..... = Video\n ------\n V....D mpeg4                MPEG-4 part 2\n V....D libx264              H.264\n'
    exit 0
  fi
done
case "$*" in
  *"-c:v mpeg4"*)
    echo "Could not write header: codec not currently supported in container" >&2
    exit 1
    ;;
  *"-c:v libx264"*)
    cat > /dev/null
    for last; do :; done
    : > "$last"
    exit 0
    ;;
esac
exit 0
"#;

const FAKE_FFPROBE: &str = r#"#!/bin/sh
echo '{"streams":[{"width":64,"height":48,"r_frame_rate":"25/1","nb_frames":"0"}]}'
"#;

struct NullPainter;

impl GlyphPainter for NullPainter {
    fn paint(&mut self, _canvas: &mut Canvas, _glyph: char, _slot: &GlyphSlot, _color: Rgb<u8>) {}
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("script should write");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("script should be executable");
    path
}

fn fake_backend(dir: &Path) -> FfmpegBackend {
    FfmpegBackend::new(FfmpegConfig {
        ffmpeg: write_script(dir, "ffmpeg", FAKE_FFMPEG),
        ffprobe: write_script(dir, "ffprobe", FAKE_FFPROBE),
    })
}

#[test]
fn encoder_that_dies_after_starting_does_not_open() {
    let dir = tempdir().expect("tempdir should create");
    let mut backend = fake_backend(dir.path());
    let output = dir.path().join("out.flv");

    let err = backend
        .open_sink(&output, &EncoderCandidate::new("mpeg4", "yuv420p"), 25.0, 120, 84)
        .err()
        .expect("mpeg4 should be rejected");
    assert!(format!("{:#}", err).contains("rejected"), "error was: {:#}", err);

    let mut sink = backend
        .open_sink(&output, &EncoderCandidate::new("libx264", "yuv420p"), 25.0, 120, 84)
        .expect("libx264 should open");
    sink.write_frame(&Canvas::new(120, 84)).expect("frame should write");
    sink.release().expect("sink should close cleanly");
}

#[test]
fn conversion_falls_back_to_the_encoder_that_works() {
    let dir = tempdir().expect("tempdir should create");
    let backend = fake_backend(dir.path());
    let input = dir.path().join("in.mp4");
    let output = dir.path().join("out.flv");
    fs::write(&input, b"stand-in").expect("input should write");

    let mut pipeline = Pipeline::new(ConverterConfig::default(), backend, NullPainter).expect("config is valid");
    let mut opened = Vec::new();
    let frames = pipeline
        .convert(&input, &output, GridWidth::new(20).expect("width is valid"), |p| {
            if p.phase == ProgressPhase::Opened {
                opened.push(p.message);
            }
        })
        .expect("conversion should succeed with libx264");

    assert_eq!(frames, 0);
    assert_eq!(opened.len(), 1);
    assert!(opened[0].contains("Encoder: libx264"), "summary was: {}", opened[0]);
    assert!(output.exists());
}

#[test]
fn every_encoder_dying_is_a_sink_error() {
    let dir = tempdir().expect("tempdir should create");
    let backend = fake_backend(dir.path());
    let input = dir.path().join("in.mp4");
    fs::write(&input, b"stand-in").expect("input should write");

    let config = ConverterConfig::default().with_encoders(vec![EncoderCandidate::new("mpeg4", "yuv420p")]);
    let mut pipeline = Pipeline::new(config, backend, NullPainter).expect("config is valid");
    let result = pipeline.convert(&input, &dir.path().join("out.flv"), GridWidth::default(), |_| {});
    match result {
        Err(ConversionError::SinkOpen { tried, .. }) => {
            assert_eq!(tried.len(), 1);
            assert!(tried[0].starts_with("mpeg4"));
        }
        other => panic!("expected SinkOpen, got {:?}", other.map(|_| ())),
    }
}
