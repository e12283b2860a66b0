use image::{imageops, imageops::FilterType, ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Represents a single decoded video frame
///
/// A thin wrapper around an RGB image buffer. Frames are ephemeral: the
/// segmenter resizes a selected frame, hands it to the open segment and
/// drops it.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    /// Create a frame from packed rgb24 bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Packed rgb24 bytes, row-major
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Scale the frame to `target` with bilinear filtering.
    ///
    /// Frames already at the target size are passed through untouched.
    pub fn resized(self, target: Resolution) -> Frame {
        if self.resolution() == target {
            return self;
        }
        let buffer = imageops::resize(&self.buffer, target.width, target.height, FilterType::Triangle);
        Frame { buffer }
    }
}

/// Pixel dimensions of a frame or stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size in bytes of one rgb24 frame at this resolution
    pub fn rgb24_frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Stream-level facts about an input video
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    pub path: PathBuf,

    /// Nominal input frame rate
    pub fps: f64,

    /// Total number of frames in the stream
    pub frame_count: u64,

    pub resolution: Resolution,

    /// Codec name reported by the container, if known
    pub codec: Option<String>,
}

impl SourceMetadata {
    /// Duration in seconds derived from frame count and frame rate
    pub fn duration_seconds(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }
}

/// Everything needed to open one output segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSpec {
    pub path: PathBuf,
    pub index: u64,
    pub fps: f64,
    pub resolution: Resolution,
    pub codec_tag: String,
}
