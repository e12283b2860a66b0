use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    config::SourceConfig,
    error::{Result, SourceError},
    video::types::{Resolution, SourceMetadata},
};

/// Subset of `ffprobe -of json` output we care about
#[derive(Debug, Default, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: Option<ProbeFormat>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProbeStream {
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub avg_frame_rate: Option<String>,
    pub r_frame_rate: Option<String>,
    pub nb_frames: Option<String>,
    pub duration: Option<String>,
    #[serde(default)]
    pub tags: Option<ProbeTags>,
    #[serde(default)]
    pub side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProbeTags {
    pub rotate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProbeSideData {
    pub rotation: Option<f64>,
}

impl ProbeStream {
    /// Display rotation in degrees, from the display matrix or the legacy `rotate` tag
    pub fn rotation(&self) -> Option<f64> {
        self.side_data_list
            .iter()
            .find_map(|side_data| side_data.rotation)
            .or_else(|| {
                self.tags
                    .as_ref()
                    .and_then(|tags| tags.rotate.as_deref())
                    .and_then(|rotate| rotate.trim().parse().ok())
            })
    }

    /// Whether ffmpeg's autorotation turns decoded frames by a quarter turn
    ///
    /// The decoder then emits `height x width` frames instead of the coded
    /// `width x height`.
    pub fn is_quarter_turned(&self) -> bool {
        self.rotation()
            .filter(|degrees| degrees.is_finite())
            .map(|degrees| ((degrees / 90.0).round() as i64).rem_euclid(2) == 1)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProbeFormat {
    pub duration: Option<String>,
}

/// Run ffprobe on the first video stream of `path`
pub fn probe_file(ffprobe: &Path, path: &Path, source: &SourceConfig) -> Result<SourceMetadata> {
    let unavailable = |reason: String| SourceError::Unavailable {
        path: path.display().to_string(),
        reason,
    };

    if !path.is_file() {
        return Err(unavailable("no such file".to_string()).into());
    }

    let output = Command::new(ffprobe)
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries",
            concat!(
                "stream=codec_name,width,height,avg_frame_rate,r_frame_rate,nb_frames,duration",
                ":stream_tags=rotate:stream_side_data=rotation:format=duration",
            ),
            "-of", "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| unavailable(format!("failed to run {}: {}", ffprobe.display(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(unavailable(stderr.trim().to_string()).into());
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| unavailable(format!("unreadable ffprobe output: {}", e)))?;

    parsed.resolve(path, source)
}

/// Parse an ffprobe rational such as `30000/1001`; `0/0` yields `None`
pub fn parse_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

fn parse_seconds(value: Option<&String>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

impl ProbeOutput {
    /// Turn raw probe output into metadata, filling gaps from `source`
    ///
    /// Dimensions are mandatory since decoding depends on them. Frame rate
    /// and frame count fall back to the configured constants, and are
    /// taken from them unconditionally when probing is disabled.
    pub fn resolve(&self, path: &Path, source: &SourceConfig) -> Result<SourceMetadata> {
        let stream = self.streams.first().ok_or_else(|| SourceError::Unavailable {
            path: path.display().to_string(),
            reason: "no video stream".to_string(),
        })?;

        let missing = |field: &str| SourceError::MissingMetadata {
            path: path.display().to_string(),
            field: field.to_string(),
        };
        let width = stream.width.filter(|w| *w > 0).ok_or_else(|| missing("width"))?;
        let height = stream.height.filter(|h| *h > 0).ok_or_else(|| missing("height"))?;

        // ffmpeg applies the display rotation while decoding
        let resolution = if stream.is_quarter_turned() {
            debug!("{} is rotated {:?} degrees, decoding as {}x{}",
                   path.display(), stream.rotation(), height, width);
            Resolution::new(height, width)
        } else {
            Resolution::new(width, height)
        };

        if !source.probe_metadata {
            debug!("Metadata probing disabled, assuming {} fps / {} frames for {}",
                   source.fallback_frame_rate, source.fallback_frame_count, path.display());
            return Ok(SourceMetadata {
                path: path.to_path_buf(),
                fps: source.fallback_frame_rate,
                frame_count: source.fallback_frame_count,
                resolution,
                codec: stream.codec_name.clone(),
            });
        }

        let fps = stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_rate)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
            .unwrap_or_else(|| {
                warn!("{} reports no frame rate, assuming {}", path.display(), source.fallback_frame_rate);
                source.fallback_frame_rate
            });

        let duration = parse_seconds(stream.duration.as_ref())
            .or_else(|| self.format.as_ref().and_then(|f| parse_seconds(f.duration.as_ref())));

        let frame_count = stream
            .nb_frames
            .as_deref()
            .and_then(|n| n.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
            .or_else(|| duration.map(|d| (d * fps).round() as u64))
            .unwrap_or_else(|| {
                warn!("{} reports no frame count, assuming {}", path.display(), source.fallback_frame_count);
                source.fallback_frame_count
            });

        Ok(SourceMetadata {
            path: path.to_path_buf(),
            fps,
            frame_count,
            resolution,
            codec: stream.codec_name.clone(),
        })
    }
}
