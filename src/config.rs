use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    segmenter::SegmentPlan,
    video::{encoder::codec_for_tag, Resolution},
};

/// Main configuration for the clip segmenter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where to look for raw recordings
    pub input: InputConfig,

    /// Segment shape and destination
    pub output: OutputConfig,

    /// How input stream metadata is obtained
    pub source: SourceConfig,

    /// External executables
    pub tools: ToolsConfig,

    /// Batch execution settings
    pub batch: BatchConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.input.validate()?;
        self.output.validate()?;
        self.source.validate()?;
        self.batch.validate()?;
        Ok(())
    }

    /// Decimation and segment-size parameters for an input at `input_frame_rate`
    pub fn plan(&self, input_frame_rate: f64) -> SegmentPlan {
        SegmentPlan::new(
            input_frame_rate,
            self.output.frame_rate,
            self.output.segment_length_seconds,
        )
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Input discovery configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory scanned (non-recursively) for videos
    pub dir: PathBuf,

    /// Accepted file extensions, without the dot; matched case-insensitively
    pub extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("original"),
            extensions: ["mp4", "avi", "mov", "mkv"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl InputConfig {
    fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(invalid("input.extensions", "[]").into());
        }
        Ok(())
    }
}

/// Output segment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `<name>_segment_<index>.<extension>` files
    pub dir: PathBuf,

    /// Frame rate of the produced segments
    pub frame_rate: f64,

    /// Target duration of a full segment in seconds
    pub segment_length_seconds: f64,

    pub width: u32,
    pub height: u32,

    /// Four-character codec tag of the output stream
    pub codec_tag: String,

    /// Container extension, without the dot
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cutSHORT"),
            frame_rate: 15.0,
            segment_length_seconds: 5.0,
            width: 640,
            height: 480,
            codec_tag: "mp4v".to_string(),
            extension: "mp4".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Path of segment `index` for an input whose base name is `prefix`
    pub fn segment_path(&self, prefix: &str, index: u64) -> PathBuf {
        self.dir.join(format!("{}_segment_{}.{}", prefix, index, self.extension))
    }

    fn validate(&self) -> Result<()> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(invalid("output.frame_rate", self.frame_rate).into());
        }

        if !(self.segment_length_seconds.is_finite() && self.segment_length_seconds > 0.0) {
            return Err(invalid("output.segment_length_seconds", self.segment_length_seconds).into());
        }

        if SegmentPlan::frames_per_segment(self.frame_rate, self.segment_length_seconds) == 0 {
            return Err(invalid(
                "output.frames_per_segment",
                format!("{} * {}", self.frame_rate, self.segment_length_seconds),
            )
            .into());
        }

        // yuv420p needs even dimensions
        if self.width == 0 || self.width % 2 != 0 {
            return Err(invalid("output.width", self.width).into());
        }
        if self.height == 0 || self.height % 2 != 0 {
            return Err(invalid("output.height", self.height).into());
        }

        if codec_for_tag(&self.codec_tag).is_none() {
            return Err(invalid("output.codec_tag", &self.codec_tag).into());
        }

        if self.extension.is_empty() || self.extension.contains(&['.', '/', '\\'][..]) {
            return Err(invalid("output.extension", &self.extension).into());
        }

        Ok(())
    }
}

/// Source metadata configuration
///
/// With `probe_metadata` off every input is assumed to run at
/// `fallback_frame_rate` with `fallback_frame_count` frames. With it on,
/// the fallbacks only fill in whatever the probe does not report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub probe_metadata: bool,
    pub fallback_frame_rate: f64,
    pub fallback_frame_count: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            probe_metadata: true,
            fallback_frame_rate: 30.0,
            fallback_frame_count: 900,
        }
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        if !(self.fallback_frame_rate.is_finite() && self.fallback_frame_rate > 0.0) {
            return Err(invalid("source.fallback_frame_rate", self.fallback_frame_rate).into());
        }
        Ok(())
    }
}

/// Paths to the ffmpeg tool suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Batch execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Files processed concurrently; 0 means one per CPU core
    pub jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

impl BatchConfig {
    /// Effective worker count
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get().max(1)
        } else {
            self.jobs
        }
    }

    fn validate(&self) -> Result<()> {
        // Anything beyond a few hundred concurrent ffmpeg pairs is a typo
        if self.jobs > 256 {
            return Err(invalid("batch.jobs", self.jobs).into());
        }
        Ok(())
    }
}
