//! # Clip-Segmenter
//!
//! Cut raw recordings into short, fixed-length training clips.
//!
//! Every video in an input directory is decoded once, decimated to a target
//! frame rate by keeping every n-th frame, resized, and re-encoded into
//! consecutive segment files of a fixed frame count.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clip_segmenter::{BatchDriver, Config, FfmpegBackend};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut config = Config::default();
//! config.input.dir = "recordings".into();
//! config.output.dir = "clips".into();
//!
//! let backend = FfmpegBackend::detect(&config.tools)?;
//! let summary = BatchDriver::new(config, backend).run()?;
//!
//! println!("{} segments written", summary.total_segments());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`segmenter`] - decimation arithmetic and the single-pass segmenter
//! - [`batch`] - directory scan and per-file driver
//! - [`video`] - frame types and the ffmpeg-backed decode/encode capability
//! - [`config`] - configuration management
//!
//! ## Segment arithmetic
//!
//! With an input at 30 fps, an output rate of 15 fps and 5 second segments,
//! every second frame is kept and each segment holds 75 frames:
//!
//! ```rust
//! use clip_segmenter::SegmentPlan;
//!
//! let plan = SegmentPlan::new(30.0, 15.0, 5.0);
//! assert_eq!(plan.frame_interval, 2);
//! assert_eq!(plan.frames_per_segment, 75);
//! assert_eq!(plan.segment_sizes(plan.selected_frames(900)), vec![75; 6]);
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod segmenter;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    batch::{BatchDriver, BatchSummary, FileOutcome},
    config::Config,
    error::{Result, SegmenterError},
    segmenter::{SegmentPlan, SegmentReport, Segmenter},
    video::{FfmpegBackend, MediaBackend},
};
