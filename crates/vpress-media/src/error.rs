//! Media error types.

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg exited with {status}: {stderr}")]
    EngineFailed { status: i32, stderr: String },

    #[error("FFmpeg timed out after {0} seconds")]
    Timeout(u64),

    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn engine_failed(status: i32, stderr: impl Into<String>) -> Self {
        Self::EngineFailed {
            status,
            stderr: stderr.into(),
        }
    }
}
