use std::path::PathBuf;
use tracing::debug;

use crate::{
    config::OutputConfig,
    error::Result,
    segmenter::plan::SegmentPlan,
    video::{FrameSource, MediaBackend, SegmentSpec, SegmentWriter},
};

/// What one segmentation pass produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentReport {
    /// Segments closed and persisted, including a trailing partial one
    pub segments_written: u64,

    /// Frames read from the source, kept or not
    pub frames_consumed: u64,

    /// Frames that survived decimation and were written
    pub frames_selected: u64,

    /// Frame count of each written segment, in index order
    pub segment_frames: Vec<u64>,

    /// Output files, in index order
    pub outputs: Vec<PathBuf>,
}

struct OpenSegment {
    writer: Box<dyn SegmentWriter>,
    path: PathBuf,
    index: u64,
}

/// Turns one decoded frame stream into a run of fixed-size segment files
///
/// The segmenter owns at most one open segment at a time. A segment is
/// opened lazily when the first frame destined for it arrives, so a stream
/// that yields no selected frames never creates a file. If anything fails
/// mid-stream the open writer is dropped, which releases its handles.
pub struct Segmenter<'a> {
    backend: &'a dyn MediaBackend,
    output: &'a OutputConfig,
    plan: SegmentPlan,
}

impl<'a> Segmenter<'a> {
    pub fn new(backend: &'a dyn MediaBackend, output: &'a OutputConfig, plan: SegmentPlan) -> Self {
        Self { backend, output, plan }
    }

    pub fn plan(&self) -> SegmentPlan {
        self.plan
    }

    /// Run a single forward pass over `source`, writing
    /// `<prefix>_segment_<n>.<ext>` files into the output directory
    pub fn segment(&self, source: &mut dyn FrameSource, prefix: &str) -> Result<SegmentReport> {
        let resolution = self.output.resolution();
        let mut report = SegmentReport::default();
        let mut open: Option<OpenSegment> = None;
        let mut segment_index: u64 = 0;

        while let Some(frame) = source.next_frame()? {
            let frame_index = report.frames_consumed;
            report.frames_consumed += 1;

            if !self.plan.is_selected(frame_index) {
                continue;
            }

            let frame = frame.resized(resolution);

            let mut segment = match open.take() {
                Some(segment) => segment,
                None => self.open_segment(prefix, segment_index)?,
            };
            segment.writer.write_frame(&frame)?;
            report.frames_selected += 1;

            if segment.writer.frames_written() >= self.plan.frames_per_segment {
                self.close_segment(segment, &mut report)?;
                segment_index += 1;
            } else {
                open = Some(segment);
            }
        }

        if let Some(partial) = open.take() {
            if partial.writer.frames_written() > 0 {
                self.close_segment(partial, &mut report)?;
            }
        }

        debug!(
            "'{}' split into {} segments ({} of {} frames kept)",
            prefix, report.segments_written, report.frames_selected, report.frames_consumed
        );
        Ok(report)
    }

    fn open_segment(&self, prefix: &str, index: u64) -> Result<OpenSegment> {
        let spec = SegmentSpec {
            path: self.output.segment_path(prefix, index),
            index,
            fps: self.output.frame_rate,
            resolution: self.output.resolution(),
            codec_tag: self.output.codec_tag.clone(),
        };
        debug!("Opening segment {}: {}", index, spec.path.display());

        let writer = self.backend.create_segment(&spec)?;
        Ok(OpenSegment { writer, path: spec.path, index })
    }

    fn close_segment(&self, segment: OpenSegment, report: &mut SegmentReport) -> Result<()> {
        let frames = segment.writer.frames_written();
        segment.writer.finish()?;
        debug!("Closed segment {} with {} frames", segment.index, frames);

        report.segments_written += 1;
        report.segment_frames.push(frames);
        report.outputs.push(segment.path);
        Ok(())
    }
}
