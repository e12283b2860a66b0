use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::{
    error::{Result, SourceError},
    video::{
        backend::FrameSource,
        ffmpeg::drain_stderr,
        types::{Frame, Resolution, SourceMetadata},
    },
};

/// Decoded frame stream read from an `ffmpeg` child process
///
/// ffmpeg emits packed rgb24 at the source resolution on stdout; every
/// frame is exactly `width * height * 3` bytes. The child is killed and
/// reaped if the source is dropped before the stream ends.
pub struct FfmpegSource {
    path: PathBuf,
    resolution: Resolution,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    frames_read: u64,
    finished: bool,
}

impl FfmpegSource {
    pub fn open(ffmpeg: &Path, metadata: &SourceMetadata) -> Result<Self> {
        let path = metadata.path.clone();
        let unavailable = |reason: String| SourceError::Unavailable {
            path: path.display().to_string(),
            reason,
        };

        let mut child = Command::new(ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&path)
            .args([
                "-map", "0:v:0",
                "-fps_mode", "passthrough",
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unavailable(format!("failed to spawn {}: {}", ffmpeg.display(), e)))?;

        let stderr = child.stderr.take().map(drain_stderr);
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(unavailable("decoder stdout not captured".to_string()).into());
            }
        };

        debug!("Decoding {} at {}", path.display(), metadata.resolution);

        Ok(Self {
            path,
            resolution: metadata.resolution,
            child,
            stdout: BufReader::with_capacity(metadata.resolution.rgb24_frame_len(), stdout),
            stderr,
            frames_read: 0,
            finished: false,
        })
    }

    /// Fill `buffer` as far as the pipe allows; returns bytes read
    fn read_frame_bytes(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn decode_failed(&self, reason: String) -> SourceError {
        SourceError::DecodeFailed {
            path: self.path.display().to_string(),
            reason,
        }
    }

    /// Reap the child after stdout hit EOF and surface a failing exit status
    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| self.decode_failed(format!("failed to wait for ffmpeg: {}", e)))?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(self.decode_failed(format!("ffmpeg exited with {}: {}", status, stderr.trim())).into());
        }
        debug!("Decoded {} frames from {}", self.frames_read, self.path.display());
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.resolution.rgb24_frame_len()];
        let filled = self
            .read_frame_bytes(&mut buffer)
            .map_err(|e| self.decode_failed(format!("pipe read failed: {}", e)))?;

        if filled < buffer.len() {
            self.finish()?;
            if filled > 0 {
                warn!("{}: dropping truncated trailing frame ({} of {} bytes)",
                      self.path.display(), filled, buffer.len());
            }
            return Ok(None);
        }

        self.frames_read += 1;
        let frame = Frame::from_rgb_bytes(self.resolution.width, self.resolution.height, buffer)
            .ok_or_else(|| self.decode_failed("frame buffer size mismatch".to_string()))?;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
