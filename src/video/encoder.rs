use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::{
    error::{EncodeError, Result},
    video::{
        backend::SegmentWriter,
        ffmpeg::drain_stderr,
        types::{Frame, Resolution, SegmentSpec},
    },
};

/// How a four-character codec tag maps onto an ffmpeg encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecChoice {
    pub encoder: &'static str,
    pub tag: Option<&'static str>,
    pub pix_fmt: &'static str,
}

/// Look up a codec tag (case-insensitive)
pub fn codec_for_tag(tag: &str) -> Option<CodecChoice> {
    let choice = match tag.to_ascii_lowercase().as_str() {
        "mp4v" => CodecChoice { encoder: "mpeg4", tag: Some("mp4v"), pix_fmt: "yuv420p" },
        "xvid" => CodecChoice { encoder: "mpeg4", tag: Some("xvid"), pix_fmt: "yuv420p" },
        "avc1" | "h264" => CodecChoice { encoder: "libx264", tag: Some("avc1"), pix_fmt: "yuv420p" },
        "mjpg" => CodecChoice { encoder: "mjpeg", tag: None, pix_fmt: "yuvj420p" },
        _ => return None,
    };
    Some(choice)
}

/// One output segment fed to an `ffmpeg` child process over stdin
///
/// Frames are written as packed rgb24. Closing stdin lets ffmpeg flush
/// the encoder and write the container trailer; [`finish`](SegmentWriter::finish)
/// waits for that and checks the exit status. Dropping an unfinished
/// writer closes stdin and reaps the child all the same.
pub struct FfmpegSegmentWriter {
    path: PathBuf,
    resolution: Resolution,
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr: Option<JoinHandle<String>>,
    frames_written: u64,
    reaped: bool,
}

impl FfmpegSegmentWriter {
    pub fn create(ffmpeg: &Path, spec: &SegmentSpec) -> Result<Self> {
        let create_failed = |reason: String| EncodeError::CreateFailed {
            path: spec.path.display().to_string(),
            reason,
        };

        let codec = codec_for_tag(&spec.codec_tag).ok_or_else(|| EncodeError::UnsupportedCodec {
            tag: spec.codec_tag.clone(),
        })?;

        let size = spec.resolution.to_string();
        let rate = spec.fps.to_string();

        let mut cmd = Command::new(ffmpeg);
        cmd.args([
            "-y",
            "-v", "error",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "-s", size.as_str(),
            "-r", rate.as_str(),
            "-i", "-",
            "-an",
            "-c:v", codec.encoder,
        ]);
        if let Some(tag) = codec.tag {
            cmd.args(["-tag:v", tag]);
        }
        cmd.args(["-pix_fmt", codec.pix_fmt])
            .arg(&spec.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| create_failed(format!("failed to spawn {}: {}", ffmpeg.display(), e)))?;

        let stderr = child.stderr.take().map(drain_stderr);
        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(create_failed("encoder stdin not captured".to_string()).into());
            }
        };

        debug!("Encoding {} with {} at {} fps", spec.path.display(), codec.encoder, spec.fps);

        Ok(Self {
            path: spec.path.clone(),
            resolution: spec.resolution,
            child,
            stdin: Some(BufWriter::with_capacity(spec.resolution.rgb24_frame_len(), stdin)),
            stderr,
            frames_written: 0,
            reaped: false,
        })
    }

    fn collect_stderr(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    }
}

impl SegmentWriter for FfmpegSegmentWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let write_failed = |reason: String| EncodeError::WriteFailed {
            path: self.path.display().to_string(),
            reason,
        };

        if frame.resolution() != self.resolution {
            return Err(write_failed(format!(
                "frame is {}, segment expects {}",
                frame.resolution(),
                self.resolution
            ))
            .into());
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| write_failed("segment already closed".to_string()))?;
        stdin
            .write_all(frame.as_rgb_bytes())
            .map_err(|e| write_failed(e.to_string()))?;

        self.frames_written += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        let path = self.path.display().to_string();
        let finalize_failed = |reason: String| EncodeError::FinalizeFailed {
            path: path.clone(),
            reason,
        };

        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().map_err(|e| finalize_failed(e.to_string()))?;
        }

        let status = self
            .child
            .wait()
            .map_err(|e| finalize_failed(format!("failed to wait for ffmpeg: {}", e)))?;
        self.reaped = true;
        let stderr = self.collect_stderr();

        if !status.success() {
            return Err(finalize_failed(format!("ffmpeg exited with {}: {}", status, stderr.trim())).into());
        }

        debug!("Wrote {} frames to {}", self.frames_written, path);
        Ok(())
    }
}

impl Drop for FfmpegSegmentWriter {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        // Closing stdin ends the input; ffmpeg finalizes what it has
        drop(self.stdin.take());
        if let Err(e) = self.child.wait() {
            warn!("Failed to reap encoder for {}: {}", self.path.display(), e);
            let _ = self.child.kill();
        }
    }
}
