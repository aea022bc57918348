use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Error type for the avtool library layer
#[derive(Error, Debug)]
pub enum AvError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0} not found. Install it or set its path with 'avtool config set'")]
    ToolNotFound(String),

    #[error("{tool} exited with status {status}")]
    ToolFailed { tool: String, status: ExitStatus },

    #[error("Requested format is not available: {0}")]
    FormatUnavailable(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output would overwrite the input file: {}", .0.display())]
    OutputIsInput(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid speed {0}: must be a number greater than 0")]
    InvalidSpeed(f64),

    #[error("No audio stream found in {}", .0.display())]
    NoAudioStream(PathBuf),

    #[error("File may be damaged or too small: {} ({size} bytes)", path.display())]
    FileTooSmall { path: PathBuf, size: u64 },

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for the avtool library
pub type Result<T> = std::result::Result<T, AvError>;

impl AvError {
    pub fn tool_not_found<S: Into<String>>(tool: S) -> Self {
        AvError::ToolNotFound(tool.into())
    }

    pub fn tool_failed<S: Into<String>>(tool: S, status: ExitStatus) -> Self {
        AvError::ToolFailed {
            tool: tool.into(),
            status,
        }
    }

    pub fn download_failed<S: Into<String>>(msg: S) -> Self {
        AvError::DownloadFailed(msg.into())
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        AvError::InvalidInput(msg.into())
    }

    pub fn probe<S: Into<String>>(msg: S) -> Self {
        AvError::Probe(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        AvError::Config(msg.into())
    }

    /// True for the yt-dlp "format not available" condition that can be recovered by
    /// choosing a different format id
    pub fn is_format_unavailable(&self) -> bool {
        matches!(self, AvError::FormatUnavailable(_))
    }
}
