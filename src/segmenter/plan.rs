/// Decimation stride and segment capacity for one input
///
/// Frame `i` of the source (0-indexed, stream order) is kept when
/// `i % frame_interval == 0`; kept frames are packed into segments of at
/// most `frames_per_segment` frames. An interval of 0 is treated as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPlan {
    pub frame_interval: u64,
    pub frames_per_segment: u64,
}

impl SegmentPlan {
    pub fn new(input_frame_rate: f64, output_frame_rate: f64, segment_length_seconds: f64) -> Self {
        Self {
            frame_interval: Self::frame_interval(input_frame_rate, output_frame_rate),
            frames_per_segment: Self::frames_per_segment(output_frame_rate, segment_length_seconds),
        }
    }

    /// `max(1, round(input / output))`
    ///
    /// Halfway ratios round to even (2.5 -> 2, 3.5 -> 4).
    pub fn frame_interval(input_frame_rate: f64, output_frame_rate: f64) -> u64 {
        let ratio = input_frame_rate / output_frame_rate;
        if !ratio.is_finite() || ratio < 1.0 {
            return 1;
        }
        (ratio.round_ties_even() as u64).max(1)
    }

    /// `floor(output_frame_rate * segment_length_seconds)`, truncating
    pub fn frames_per_segment(output_frame_rate: f64, segment_length_seconds: f64) -> u64 {
        let frames = output_frame_rate * segment_length_seconds;
        if !frames.is_finite() || frames <= 0.0 {
            return 0;
        }
        frames.trunc() as u64
    }

    /// Whether the frame at `index` in the source survives decimation
    pub fn is_selected(&self, index: u64) -> bool {
        index % self.stride() == 0
    }

    /// Number of frames kept from a stream of `total_frames`
    pub fn selected_frames(&self, total_frames: u64) -> u64 {
        total_frames.div_ceil(self.stride())
    }

    fn stride(&self) -> u64 {
        self.frame_interval.max(1)
    }

    /// Number of segments produced from `selected` kept frames
    pub fn segment_count(&self, selected: u64) -> u64 {
        if self.frames_per_segment == 0 {
            return 0;
        }
        selected.div_ceil(self.frames_per_segment)
    }

    /// Expected frame count of every segment, in order
    pub fn segment_sizes(&self, selected: u64) -> Vec<u64> {
        let count = self.segment_count(selected);
        (0..count)
            .map(|i| (selected - i * self.frames_per_segment).min(self.frames_per_segment))
            .collect()
    }

    /// Effective output duration of one full segment at `output_frame_rate`
    pub fn segment_duration(&self, output_frame_rate: f64) -> f64 {
        self.frames_per_segment as f64 / output_frame_rate
    }
}
