use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{ChildStderr, Command, Stdio};
use std::thread::{self, JoinHandle};

use tracing::info;

use crate::{
    config::{SourceConfig, ToolsConfig},
    error::{Result, SegmenterError},
    video::{
        backend::{FrameSource, MediaBackend, SegmentWriter},
        decoder::FfmpegSource,
        encoder::FfmpegSegmentWriter,
        probe::probe_file,
        types::{SegmentSpec, SourceMetadata},
    },
};

/// Media backend driving the `ffmpeg` / `ffprobe` executables
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegBackend {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
        }
    }

    /// Build a backend after checking both executables respond to `-version`
    pub fn detect(tools: &ToolsConfig) -> Result<Self> {
        let backend = Self::new(tools);
        for tool in [&backend.ffmpeg, &backend.ffprobe] {
            if !Self::check_available(tool) {
                return Err(SegmenterError::generic(format!(
                    "{} not found. Please install FFmpeg or set [tools] in the configuration.",
                    tool.display()
                )));
            }
        }
        info!("Using {} and {}", backend.ffmpeg.display(), backend.ffprobe.display());
        Ok(backend)
    }

    pub fn check_available(tool: &Path) -> bool {
        Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn probe(&self, path: &Path, source: &SourceConfig) -> Result<SourceMetadata> {
        probe_file(&self.ffprobe, path, source)
    }

    fn open_source(&self, metadata: &SourceMetadata) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(FfmpegSource::open(&self.ffmpeg, metadata)?))
    }

    fn create_segment(&self, spec: &SegmentSpec) -> Result<Box<dyn SegmentWriter>> {
        Ok(Box::new(FfmpegSegmentWriter::create(&self.ffmpeg, spec)?))
    }
}

/// Collect a child's stderr on a helper thread so a chatty ffmpeg can
/// never block on a full pipe while we are busy with stdout/stdin
pub(crate) fn drain_stderr(mut stderr: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        let _ = stderr.read_to_string(&mut text);
        text
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_not_available() {
        assert!(!FfmpegBackend::check_available(Path::new("/nonexistent/ffmpeg")));
    }

    #[test]
    fn test_detect_reports_missing_tools() {
        let tools = ToolsConfig {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg"),
            ffprobe: PathBuf::from("/nonexistent/ffprobe"),
        };
        assert!(FfmpegBackend::detect(&tools).is_err());
    }
}
