//! Record store integration tests.
//!
//! These run against a live DynamoDB table and are ignored by default:
//! `cargo test -p vpress-records -- --ignored`

use chrono::Utc;

use vpress_models::{CompressionJob, CompressionRecord};
use vpress_records::RecordStore;

fn sample_record() -> CompressionRecord {
    let job = CompressionJob::new("test_user_records", "1700000000000-clip.mov")
        .expect("valid envelope");
    let name = job.derived_output_name(Utc::now().timestamp_millis());
    let key = format!("compressed-videos/{name}");
    CompressionRecord::for_completed_job(&job, &name, &key, 10_000_000, 2_500_000)
}

/// Put, get, query, delete lifecycle against a real table.
#[tokio::test]
#[ignore = "requires DynamoDB"]
async fn test_record_lifecycle() {
    dotenvy::dotenv().ok();

    let store = RecordStore::from_env().await.expect("Failed to create store");
    let record = sample_record();

    store.put_record(&record).await.expect("Failed to put");

    let fetched = store
        .get_record(&record.username, &record.compressed_filename)
        .await
        .expect("Failed to get")
        .expect("Record missing after put");
    assert_eq!(fetched.s3_key, record.s3_key);
    assert_eq!(fetched.original_size_bytes, record.original_size_bytes);

    let all = store
        .query_by_owner(&record.username)
        .await
        .expect("Failed to query");
    assert!(all
        .iter()
        .any(|r| r.compressed_filename == record.compressed_filename));

    store
        .delete_record(&record.username, &record.compressed_filename)
        .await
        .expect("Failed to delete");

    let gone = store
        .get_record(&record.username, &record.compressed_filename)
        .await
        .expect("Failed to get after delete");
    assert!(gone.is_none());
}
