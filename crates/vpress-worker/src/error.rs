//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid worker configuration: {0}")]
    Config(String),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vpress_storage::StorageError),

    #[error("Record store error: {0}")]
    Records(#[from] vpress_records::RecordError),

    #[error("Transform error: {0}")]
    Media(#[from] vpress_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] vpress_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Whether redelivery is expected to help.
    ///
    /// Everything except an internal invariant breakage or a bad
    /// configuration is retried via the queue's visibility window; the
    /// retry budget then bounds inputs that fail permanently.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WorkerError::JobFailed(_) | WorkerError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpress_media::MediaError;

    #[test]
    fn test_engine_failures_are_retryable() {
        let err = WorkerError::from(MediaError::Timeout(900));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_internal_failures_are_not() {
        assert!(!WorkerError::job_failed("invariant broken").is_retryable());
        assert!(!WorkerError::config("bad window").is_retryable());
    }
}
