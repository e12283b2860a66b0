use std::path::Path;

use crate::{
    config::SourceConfig,
    error::Result,
    video::types::{Frame, SegmentSpec, SourceMetadata},
};

/// The external decode/encode capability the segmenter runs on top of
///
/// The segmenter never touches codecs or containers itself. Everything it
/// needs from the outside world goes through this trait, which keeps the
/// decimation and segmentation logic testable without ffmpeg installed.
pub trait MediaBackend: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &str;

    /// Read stream metadata for an input file
    ///
    /// Fails with [`SourceError::Unavailable`](crate::error::SourceError::Unavailable)
    /// when the file cannot be opened as a video at all.
    fn probe(&self, path: &Path, source: &SourceConfig) -> Result<SourceMetadata>;

    /// Start a single forward pass over the decoded frames of a probed input
    fn open_source(&self, metadata: &SourceMetadata) -> Result<Box<dyn FrameSource>>;

    /// Allocate a new output segment
    fn create_segment(&self, spec: &SegmentSpec) -> Result<Box<dyn SegmentWriter>>;
}

/// A lazy, finite, non-restartable sequence of decoded frames
pub trait FrameSource {
    /// Next frame in stream order, or `None` once the stream is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// One open output segment
///
/// Dropping a writer without calling [`finish`](SegmentWriter::finish)
/// must still release every handle it holds.
pub trait SegmentWriter {
    /// Append a frame; its resolution must match the segment's
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Number of frames appended so far
    fn frames_written(&self) -> u64;

    /// Close and persist the segment
    fn finish(self: Box<Self>) -> Result<()>;
}
