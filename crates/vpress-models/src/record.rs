//! The durable result record written after a successful job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::CompressionJob;

/// Metadata describing one completed compression job.
///
/// Keyed by `(username, compressed_filename)`. Created exactly once per
/// successful job, deleted only by an explicit user delete, and never
/// mutated in between. `s3_key` is a durable reference into the object
/// store, not a presigned URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionRecord {
    /// Owner of the job.
    pub username: String,

    /// Name of the original object.
    pub original_filename: String,

    /// Derived name of the compressed object. Unique per attempt.
    pub compressed_filename: String,

    /// When the record was written.
    pub upload_date: DateTime<Utc>,

    /// Size of the original file in bytes.
    pub original_size_bytes: u64,

    /// Size of the compressed file in bytes.
    pub compressed_size_bytes: u64,

    /// Durable object store key of the compressed output.
    pub s3_key: String,
}

impl CompressionRecord {
    /// Build a record for a completed attempt of `job`.
    pub fn for_completed_job(
        job: &CompressionJob,
        compressed_filename: impl Into<String>,
        s3_key: impl Into<String>,
        original_size_bytes: u64,
        compressed_size_bytes: u64,
    ) -> Self {
        Self {
            username: job.username.clone(),
            original_filename: job.file_name.clone(),
            compressed_filename: compressed_filename.into(),
            upload_date: Utc::now(),
            original_size_bytes,
            compressed_size_bytes,
            s3_key: s3_key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CompressionRecord {
        let job = CompressionJob::new("alice", "clip.mov").unwrap();
        CompressionRecord::for_completed_job(
            &job,
            "clip-compressed-1700000000123.mp4",
            "compressed-videos/clip-compressed-1700000000123.mp4",
            10_485_760,
            2_097_152,
        )
    }

    #[test]
    fn test_record_attributes_come_from_the_job() {
        let r = record();
        assert_eq!(r.username, "alice");
        assert_eq!(r.original_filename, "clip.mov");
        assert!(r.compressed_filename.ends_with(".mp4"));
        assert!(r.s3_key.starts_with("compressed-videos/"));
    }

    #[test]
    fn test_record_serializes_with_wire_field_names() {
        let json = serde_json::to_value(record()).unwrap();
        assert!(json.get("originalFilename").is_some());
        assert!(json.get("compressedFilename").is_some());
        assert!(json.get("uploadDate").is_some());
        assert!(json["originalSizeBytes"].is_number());
        assert!(json["compressedSizeBytes"].is_number());
    }
}
