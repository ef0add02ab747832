//! Per-message processing pipeline.
//!
//! One received envelope moves through download, transform, upload,
//! persist, and cleanup, strictly in that order. The object upload
//! always precedes the record write so a record never references a
//! missing object. Any step's failure propagates to the executor,
//! which leaves the message unacknowledged for redelivery.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use vpress_media::compress;
use vpress_models::{CompressionJob, CompressionRecord};
use vpress_records::RecordStore;
use vpress_storage::{result_key, source_key, ObjectStore};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::temp::JobWorkspace;

/// Shared clients and settings for job processing.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub storage: Arc<ObjectStore>,
    pub records: Arc<RecordStore>,
}

impl ProcessingContext {
    /// Construct all clients from the environment.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let storage = ObjectStore::from_env().await?;
        let records = RecordStore::from_env().await?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            records: Arc::new(records),
        })
    }
}

/// Process one envelope end to end.
///
/// A redelivered envelope derives a fresh attempt stamp, so a retry
/// after a crash between persist and acknowledge creates an
/// independent record rather than failing on the earlier attempt's
/// leftovers.
#[instrument(skip(ctx, job), fields(username = %job.username, file = %job.file_name))]
pub async fn process_job(ctx: &ProcessingContext, job: &CompressionJob) -> WorkerResult<()> {
    let stamp = Utc::now().timestamp_millis();
    let output_name = job.derived_output_name(stamp);

    // Workspace removal runs on every exit path below.
    let workspace = JobWorkspace::create(
        &ctx.config.work_dir,
        &job.username,
        stamp,
        &job.file_name,
        &output_name,
    )?;

    // RECEIVED -> TRANSFORMING
    let src_key = source_key(&job.file_name);
    ctx.storage.download_file(&src_key, workspace.input()).await?;

    compress(
        workspace.input(),
        workspace.output(),
        job,
        ctx.config.transform_timeout.as_secs(),
    )
    .await?;

    // TRANSFORMING -> UPLOADING
    let out_key = result_key(&output_name);
    ctx.storage
        .upload_file(workspace.output(), &out_key, job.format.content_type())
        .await?;

    // UPLOADING -> PERSISTING
    let original_size = tokio::fs::metadata(workspace.input()).await?.len();
    let compressed_size = tokio::fs::metadata(workspace.output()).await?.len();

    let record = CompressionRecord::for_completed_job(
        job,
        &output_name,
        &out_key,
        original_size,
        compressed_size,
    );
    ctx.records.put_record(&record).await?;

    info!(
        output = %output_name,
        original_size,
        compressed_size,
        "Job processed"
    );

    // PERSISTING -> CLEANING_UP: workspace drops here; the executor
    // acknowledges only after this returns Ok.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_stamps_never_reuse_output_keys() {
        // Two attempts at the same envelope must land on distinct keys.
        let job = CompressionJob::new("alice", "clip.mov").unwrap();
        let first = result_key(&job.derived_output_name(1700000000001));
        let second = result_key(&job.derived_output_name(1700000000002));
        assert_ne!(first, second);
        assert!(first.starts_with("compressed-videos/"));
    }

    #[test]
    fn test_source_and_result_keys_use_distinct_namespaces() {
        let job = CompressionJob::new("alice", "clip.mov").unwrap();
        let src = source_key(&job.file_name);
        let out = result_key(&job.derived_output_name(9));
        assert!(src.starts_with("uploads/"));
        assert!(out.starts_with("compressed-videos/"));
    }

    #[test]
    fn test_concurrent_owners_get_attributed_records_and_separate_workspaces() {
        let root = tempfile::tempdir().unwrap();
        let alice = CompressionJob::new("alice", "clip.mov").unwrap();
        let bob = CompressionJob::new("bob", "clip.mov").unwrap();

        // Attempt stamps are taken per attempt inside process_job.
        let (stamp_a, stamp_b) = (1700000000001, 1700000000002);
        let name_a = alice.derived_output_name(stamp_a);
        let name_b = bob.derived_output_name(stamp_b);

        let ws_a =
            JobWorkspace::create(root.path(), &alice.username, stamp_a, &alice.file_name, &name_a)
                .unwrap();
        let ws_b =
            JobWorkspace::create(root.path(), &bob.username, stamp_b, &bob.file_name, &name_b)
                .unwrap();
        assert_ne!(ws_a.input(), ws_b.input());

        let rec_a = CompressionRecord::for_completed_job(
            &alice,
            &name_a,
            &result_key(&name_a),
            10_000_000,
            2_500_000,
        );
        let rec_b = CompressionRecord::for_completed_job(
            &bob,
            &name_b,
            &result_key(&name_b),
            8_000_000,
            2_000_000,
        );

        assert_eq!(rec_a.username, "alice");
        assert_eq!(rec_b.username, "bob");
        assert_eq!(rec_a.original_filename, "clip.mov");
        assert_eq!(rec_b.original_filename, "clip.mov");
        assert_ne!(rec_a.s3_key, rec_b.s3_key);
    }

    #[test]
    fn test_redelivery_after_lost_ack_creates_independent_record() {
        // First attempt persisted its record but the ack never landed.
        // The redelivered attempt derives a fresh stamp, so its record
        // key and object key cannot conflict with the first attempt's.
        let job = CompressionJob::new("alice", "clip.mov").unwrap();

        let first_name = job.derived_output_name(1700000000001);
        let second_name = job.derived_output_name(1700000000002);

        let first = CompressionRecord::for_completed_job(
            &job,
            &first_name,
            &result_key(&first_name),
            10_000_000,
            2_500_000,
        );
        let second = CompressionRecord::for_completed_job(
            &job,
            &second_name,
            &result_key(&second_name),
            10_000_000,
            2_400_000,
        );

        // Records share a partition key but never a sort key.
        assert_eq!(first.username, second.username);
        assert_ne!(first.compressed_filename, second.compressed_filename);
        assert_ne!(first.s3_key, second.s3_key);
    }
}
