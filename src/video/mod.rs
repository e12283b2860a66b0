//! # Video I/O Module
//!
//! Frame and metadata types plus the external decode/encode capability.
//! The default backend shells out to `ffmpeg` and `ffprobe`, streaming
//! raw rgb24 frames through pipes.

pub mod backend;
pub mod decoder;
pub mod encoder;
pub mod ffmpeg;
pub mod probe;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{FrameSource, MediaBackend, SegmentWriter};
pub use ffmpeg::FfmpegBackend;
pub use types::{Frame, Resolution, SegmentSpec, SourceMetadata};
