use thiserror::Error;

/// Main error type for the clip segmenter
#[derive(Error, Debug)]
pub enum SegmenterError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised while opening or reading an input video
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Could not open video source: {path} ({reason})")]
    Unavailable { path: String, reason: String },

    #[error("Video source {path} does not report {field}")]
    MissingMetadata { path: String, field: String },

    #[error("Decoding failed for {path}: {reason}")]
    DecodeFailed { path: String, reason: String },
}

/// Errors raised while creating or writing an output segment
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Could not create segment {path}: {reason}")]
    CreateFailed { path: String, reason: String },

    #[error("Could not write frame to segment {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Could not finalize segment {path}: {reason}")]
    FinalizeFailed { path: String, reason: String },

    #[error("Unsupported codec tag: {tag}")]
    UnsupportedCodec { tag: String },

    #[error("Segment name '{prefix}' of {path} is already used by {claimed_by}")]
    PrefixTaken { path: String, prefix: String, claimed_by: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using SegmenterError
pub type Result<T> = std::result::Result<T, SegmenterError>;

impl SegmenterError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Whether the failure is scoped to a single input file.
    ///
    /// The batch driver logs these as skipped files and anything else as a
    /// failure; either way the file is recorded and the batch continues.
    /// Errors raised before any file is processed (bad configuration,
    /// unreadable input directory) stop the run.
    pub fn is_per_file(&self) -> bool {
        matches!(self, Self::Source(_) | Self::Encode(_))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Source(SourceError::Unavailable { path, .. }) => {
                format!("Could not open video file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Encode(EncodeError::PrefixTaken { path, claimed_by, .. }) => {
                format!("Skipped '{}': its segments would overwrite those of '{}'. Rename one of the files.", path, claimed_by)
            }
            Self::Encode(EncodeError::UnsupportedCodec { tag }) => {
                format!("Codec tag '{}' is not supported. Available tags: mp4v, avc1, h264, mjpg, xvid", tag)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
