//! Video I/O through the `ffmpeg` and `ffprobe` command-line tools. Frames
//! cross the process boundary as raw `rgb24` on stdin/stdout.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{self, Child, ChildStdin, ChildStdout, Command as ProcCommand, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use serde::Deserialize;

use crate::config::{EncoderCandidate, FfmpegConfig};
use crate::video::{StreamInfo, VideoBackend, VideoSink, VideoSource};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Parse an ffprobe rate such as `30000/1001` or `25`. Zero and malformed
/// rates give `None`.
pub(crate) fn parse_rate(text: &str) -> Option<f64> {
    let rate = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => text.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

pub(crate) fn parse_probe(json: &str) -> Result<StreamInfo> {
    let probe: ProbeOutput = serde_json::from_str(json).context("parsing ffprobe json")?;
    let stream = probe.streams.into_iter().next().ok_or_else(|| anyhow!("no video stream found"))?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        bail!("video stream reports zero dimensions ({}x{})", width, height);
    }

    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or(0.0);
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok())
        .filter(|&n| n > 0);

    Ok(StreamInfo {
        width,
        height,
        frame_rate,
        frame_count,
    })
}

/// Encoder names from `ffmpeg -encoders`.
pub(crate) fn parse_encoder_list(text: &str) -> HashSet<String> {
    text.lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

pub(crate) fn decoder_args(input: &Path) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-nostdin".into(),
        "-noautorotate".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-".into(),
    ]
}

pub(crate) fn encoder_args(output: &Path, encoder: &EncoderCandidate, frame_rate: f64, width: u32, height: u32) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s:v".into(),
        format!("{}x{}", width, height),
        "-r".into(),
        frame_rate.to_string(),
        "-i".into(),
        "-".into(),
        "-an".into(),
        "-c:v".into(),
        encoder.codec.clone(),
        "-pix_fmt".into(),
        encoder.pixel_format.clone(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Scratch file for a trial encode, in the same container as `output`.
pub(crate) fn trial_path(output: &Path, codec: &str) -> PathBuf {
    let mut path = env::temp_dir().join(format!("vascii-trial-{}-{}", process::id(), codec));
    if let Some(extension) = output.extension() {
        path.set_extension(extension);
    }
    path
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Opens sources and sinks by running ffprobe/ffmpeg child processes.
pub struct FfmpegBackend {
    config: FfmpegConfig,
    encoders: Option<HashSet<String>>,
}

impl FfmpegBackend {
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config, encoders: None }
    }

    fn probe(&self, path: &Path) -> Result<StreamInfo> {
        let output = ProcCommand::new(&self.config.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames"])
            .args(["-of", "json"])
            .arg(path)
            .output()
            .with_context(|| format!("running {}", self.config.ffprobe.display()))?;
        if !output.status.success() {
            bail!("ffprobe failed: {}", String::from_utf8_lossy(&output.stderr).trim());
        }
        parse_probe(&String::from_utf8_lossy(&output.stdout))
    }

    fn available_encoders(&mut self) -> Result<&HashSet<String>> {
        if self.encoders.is_none() {
            let output = ProcCommand::new(&self.config.ffmpeg)
                .args(["-hide_banner", "-encoders"])
                .stdin(Stdio::null())
                .output()
                .with_context(|| format!("running {} -encoders", self.config.ffmpeg.display()))?;
            if !output.status.success() {
                bail!("ffmpeg -encoders failed with {}", output.status);
            }
            self.encoders = Some(parse_encoder_list(&String::from_utf8_lossy(&output.stdout)));
        }
        self.encoders.as_ref().ok_or_else(|| anyhow!("encoder list unavailable"))
    }

    /// Encode one black frame with the exact settings of the real output.
    /// Codecs the container cannot hold only fail once ffmpeg writes the
    /// header, so listing the encoder is not enough.
    fn trial_encode(&self, path: &Path, encoder: &EncoderCandidate, frame_rate: f64, width: u32, height: u32) -> Result<()> {
        let trial = trial_path(path, &encoder.codec);
        let mut child = ProcCommand::new(&self.config.ffmpeg)
            .args(encoder_args(&trial, encoder, frame_rate, width, height))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn ffmpeg encoder {}", encoder.codec))?;

        let frame = vec![0u8; width as usize * height as usize * 3];
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&frame),
            None => Err(ErrorKind::BrokenPipe.into()),
        };
        let output = child.wait_with_output().context("waiting for ffmpeg trial encode");
        let _ = fs::remove_file(&trial);
        let output = output?;

        if !output.status.success() {
            bail!(
                "encoder {} rejected {}: {}",
                encoder.codec,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        written.with_context(|| format!("feeding trial frame to encoder {}", encoder.codec))
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new(FfmpegConfig::default())
    }
}

impl VideoBackend for FfmpegBackend {
    type Source = FfmpegSource;
    type Sink = FfmpegSink;

    fn open_source(&mut self, path: &Path) -> Result<FfmpegSource> {
        if !path.is_file() {
            bail!("no such file");
        }
        let info = self.probe(path)?;

        let mut child = ProcCommand::new(&self.config.ffmpeg)
            .args(decoder_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn ffmpeg decoder")?;
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                kill_and_reap(&mut child);
                bail!("failed to capture ffmpeg stdout");
            }
        };

        Ok(FfmpegSource {
            frame_len: info.width as usize * info.height as usize * 3,
            info,
            child: Some(child),
            stdout: Some(stdout),
        })
    }

    fn open_sink(&mut self, path: &Path, encoder: &EncoderCandidate, frame_rate: f64, width: u32, height: u32) -> Result<FfmpegSink> {
        if !self.available_encoders()?.contains(&encoder.codec) {
            bail!("encoder {} is not available in this ffmpeg build", encoder.codec);
        }
        self.trial_encode(path, encoder, frame_rate, width, height)?;

        let mut child = ProcCommand::new(&self.config.ffmpeg)
            .args(encoder_args(path, encoder, frame_rate, width, height))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to spawn ffmpeg encoder {}", encoder.codec))?;
        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                kill_and_reap(&mut child);
                bail!("failed to capture ffmpeg stdin");
            }
        };

        Ok(FfmpegSink {
            width,
            height,
            child: Some(child),
            stdin: Some(stdin),
        })
    }
}

/// Decoder child process; frames are read on the calling thread.
pub struct FfmpegSource {
    info: StreamInfo,
    frame_len: usize,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegSource {
    /// Reap the decoder after its output ended.
    fn finish(&mut self) -> Result<()> {
        self.stdout.take();
        if let Some(mut child) = self.child.take() {
            let status = child.wait().context("waiting for ffmpeg decoder")?;
            if !status.success() {
                bail!("ffmpeg decoder exited with {}", status);
            }
        }
        Ok(())
    }
}

impl VideoSource for FfmpegSource {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buffer.len() {
            match stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("reading from ffmpeg decoder"),
            }
        }

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }
        if filled < buffer.len() {
            bail!("decoder output ended mid-frame ({} of {} bytes)", filled, buffer.len());
        }
        RgbImage::from_raw(self.info.width, self.info.height, buffer)
            .map(Some)
            .ok_or_else(|| anyhow!("decoded frame has the wrong size"))
    }

    fn release(&mut self) -> Result<()> {
        self.stdout.take();
        if let Some(mut child) = self.child.take() {
            // Stopping early leaves the decoder blocked on a full pipe.
            if child.try_wait().context("polling ffmpeg decoder")?.is_none() {
                kill_and_reap(&mut child);
            }
        }
        Ok(())
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            kill_and_reap(&mut child);
        }
    }
}

/// Encoder child process fed through its stdin.
pub struct FfmpegSink {
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl VideoSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            bail!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            );
        }
        let stdin = self.stdin.as_mut().ok_or_else(|| anyhow!("encoder already released"))?;
        stdin.write_all(frame.as_raw()).context("writing to ffmpeg encoder")
    }

    fn release(&mut self) -> Result<()> {
        // Closing stdin is what tells ffmpeg the stream is over.
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            let status = child.wait().context("waiting for ffmpeg encoder")?;
            if !status.success() {
                bail!("ffmpeg encoder exited with {}", status);
            }
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            kill_and_reap(&mut child);
        }
    }
}
