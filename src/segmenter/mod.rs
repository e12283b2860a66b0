//! # Segmenter
//!
//! Frame-rate decimation and fixed-length segmentation of a single
//! decoded video stream.
//!
//! [`SegmentPlan`] holds the two derived numbers that decide everything:
//! the stride between kept frames and the capacity of a segment.
//! [`Segmenter`] walks the stream once and drives a
//! [`MediaBackend`](crate::video::MediaBackend) to write the segments.

pub mod engine;
pub mod plan;

pub use engine::{SegmentReport, Segmenter};
pub use plan::SegmentPlan;
