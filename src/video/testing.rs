//! In-memory media backend for unit tests.
//!
//! Sources are synthetic frame streams registered per path; segments are
//! recorded instead of encoded, and an empty marker file is written on
//! `finish` so directory-level assertions behave like the real backend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::{
    config::SourceConfig,
    error::{EncodeError, Result, SourceError},
    video::{
        backend::{FrameSource, MediaBackend, SegmentWriter},
        types::{Frame, Resolution, SegmentSpec, SourceMetadata},
    },
};

#[derive(Debug, Clone)]
pub struct FakeInput {
    pub fps: f64,
    pub frame_count: u64,
    pub resolution: Resolution,
    /// Fail decoding once this many frames have been produced
    pub fail_after: Option<u64>,
}

impl FakeInput {
    pub fn new(fps: f64, frame_count: u64) -> Self {
        Self {
            fps,
            frame_count,
            resolution: Resolution::new(64, 48),
            fail_after: None,
        }
    }
}

/// A segment as seen by the backend
#[derive(Debug, Clone)]
pub struct RecordedSegment {
    pub spec: SegmentSpec,
    /// First pixel of every written frame; its red channel carries the
    /// source frame index modulo 256
    pub markers: Vec<[u8; 3]>,
    pub finished: bool,
}

#[derive(Default)]
pub struct FakeBackend {
    inputs: HashMap<PathBuf, FakeInput>,
    segments: Arc<Mutex<Vec<RecordedSegment>>>,
    /// Refuse to create segments with this index
    pub fail_create_at: Option<u64>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, path: impl Into<PathBuf>, input: FakeInput) -> Self {
        self.inputs.insert(path.into(), input);
        self
    }

    pub fn segments(&self) -> Vec<RecordedSegment> {
        self.segments.lock().unwrap().clone()
    }

    /// Build a standalone source without going through `probe`
    pub fn source(input: FakeInput) -> FakeSource {
        FakeSource { input, next: 0 }
    }
}

impl MediaBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn probe(&self, path: &Path, source: &SourceConfig) -> Result<SourceMetadata> {
        let input = self.inputs.get(path).ok_or_else(|| SourceError::Unavailable {
            path: path.display().to_string(),
            reason: "not registered".to_string(),
        })?;

        let (fps, frame_count) = if source.probe_metadata {
            (input.fps, input.frame_count)
        } else {
            (source.fallback_frame_rate, source.fallback_frame_count)
        };

        Ok(SourceMetadata {
            path: path.to_path_buf(),
            fps,
            frame_count,
            resolution: input.resolution,
            codec: Some("fake".to_string()),
        })
    }

    fn open_source(&self, metadata: &SourceMetadata) -> Result<Box<dyn FrameSource>> {
        let input = self.inputs.get(&metadata.path).ok_or_else(|| SourceError::Unavailable {
            path: metadata.path.display().to_string(),
            reason: "not registered".to_string(),
        })?;
        Ok(Box::new(Self::source(input.clone())))
    }

    fn create_segment(&self, spec: &SegmentSpec) -> Result<Box<dyn SegmentWriter>> {
        if self.fail_create_at == Some(spec.index) {
            return Err(EncodeError::CreateFailed {
                path: spec.path.display().to_string(),
                reason: "injected failure".to_string(),
            }
            .into());
        }

        let mut segments = self.segments.lock().unwrap();
        segments.push(RecordedSegment {
            spec: spec.clone(),
            markers: Vec::new(),
            finished: false,
        });

        Ok(Box::new(FakeWriter {
            slot: segments.len() - 1,
            segments: Arc::clone(&self.segments),
            written: 0,
        }))
    }
}

pub struct FakeSource {
    input: FakeInput,
    next: u64,
}

impl FrameSource for FakeSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.input.fail_after == Some(self.next) {
            return Err(SourceError::DecodeFailed {
                path: "fake".to_string(),
                reason: "injected failure".to_string(),
            }
            .into());
        }
        if self.next >= self.input.frame_count {
            return Ok(None);
        }

        let marker = [(self.next % 256) as u8, 0, 0];
        self.next += 1;
        Ok(Some(Frame::new_filled(
            self.input.resolution.width,
            self.input.resolution.height,
            marker,
        )))
    }
}

struct FakeWriter {
    slot: usize,
    segments: Arc<Mutex<Vec<RecordedSegment>>>,
    written: u64,
}

impl SegmentWriter for FakeWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let mut segments = self.segments.lock().unwrap();
        let segment = &mut segments[self.slot];
        assert_eq!(frame.resolution(), segment.spec.resolution);
        segment.markers.push(frame.get_pixel(0, 0));
        self.written += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.written
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let mut segments = self.segments.lock().unwrap();
        let segment = &mut segments[self.slot];
        std::fs::write(&segment.spec.path, b"")?;
        segment.finished = true;
        Ok(())
    }
}

/// Write an executable shell script standing in for `ffmpeg`
///
/// The script ignores the arguments it is given unless `body` reads them.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
