//! The job envelope placed on the queue.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::params::{Bitrate, FrameRate, OutputFormat, Resolution};

/// Error building an envelope from submission input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("owner must not be empty")]
    EmptyOwner,
    #[error("source file name must not be empty")]
    EmptyFileName,
}

/// One unit of compression work.
///
/// Serialized as the queue wire shape: all fields are strings on the
/// wire, optional parameters default when missing, and unknown extra
/// fields are ignored. The envelope is read-only after enqueue and is
/// consumed when the worker acknowledges the carrying message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionJob {
    /// Owner of the job. Set at submission, never changed.
    pub username: String,

    /// Name of the original object under the upload namespace.
    pub file_name: String,

    /// Target container format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Target resolution class.
    #[serde(default)]
    pub resolution: Resolution,

    /// Target bitrate class.
    #[serde(default)]
    pub bitrate: Bitrate,

    /// Target frame rate.
    #[serde(default)]
    pub frame_rate: FrameRate,
}

impl CompressionJob {
    /// Build an envelope, rejecting empty required fields.
    pub fn new(
        username: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<Self, EnvelopeError> {
        let username = username.into();
        let file_name = file_name.into();

        if username.trim().is_empty() {
            return Err(EnvelopeError::EmptyOwner);
        }
        if file_name.trim().is_empty() {
            return Err(EnvelopeError::EmptyFileName);
        }

        Ok(Self {
            username,
            file_name,
            format: OutputFormat::default(),
            resolution: Resolution::default(),
            bitrate: Bitrate::default(),
            frame_rate: FrameRate::default(),
        })
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_bitrate(mut self, bitrate: Bitrate) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Derive the output object name for one processing attempt.
    ///
    /// The stamp makes concurrent attempts (including redeliveries of
    /// the same envelope) land on distinct keys, so reprocessing can
    /// never corrupt an earlier result.
    pub fn derived_output_name(&self, stamp_millis: i64) -> String {
        let stem = match self.file_name.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => self.file_name.as_str(),
        };
        format!(
            "{}-compressed-{}.{}",
            stem,
            stamp_millis,
            self.format.extension()
        )
    }
}

impl fmt::Display for CompressionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({} {} {} {}fps)",
            self.username, self.file_name, self.format, self.resolution, self.bitrate, self.frame_rate
        )
    }
}
