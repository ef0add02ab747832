//! Record store error types.

use thiserror::Error;

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to configure record store: {0}")]
    ConfigError(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Throttled: {0}")]
    Throttled(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Malformed record item: {0}")]
    Malformed(String),
}

impl RecordError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Classify an SDK failure by its message.
    ///
    /// Throttling and transient server errors are retryable; validation
    /// and conditional failures are not.
    pub fn from_sdk_message(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.contains("Throttling")
            || msg.contains("ProvisionedThroughputExceeded")
            || msg.contains("RequestLimitExceeded")
        {
            Self::Throttled(msg)
        } else {
            Self::RequestFailed(msg)
        }
    }

    /// Check if the operation is worth retrying in place.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecordError::Throttled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttling_messages_are_retryable() {
        let err = RecordError::from_sdk_message("ProvisionedThroughputExceededException: slow down");
        assert!(matches!(err, RecordError::Throttled(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_failures_are_not_retryable() {
        let err = RecordError::from_sdk_message("ValidationException: bad key");
        assert!(matches!(err, RecordError::RequestFailed(_)));
        assert!(!err.is_retryable());
        assert!(!RecordError::not_found("x").is_retryable());
    }
}
