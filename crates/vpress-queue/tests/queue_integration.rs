//! Queue integration tests.
//!
//! These run against a live Redis and are ignored by default:
//! `cargo test -p vpress-queue -- --ignored`

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use vpress_models::{Bitrate, CompressionJob};
use vpress_queue::{JobQueue, QueueConfig};

/// Connection and basic depth query.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_connection() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let len = queue.len().await.expect("Failed to get queue length");
    println!("Queue length: {}", len);
}

/// Full enqueue, receive, acknowledge cycle.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_job_enqueue_receive_ack() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = CompressionJob::new("test_user_123", "1700000000000-clip.mov")
        .expect("valid envelope")
        .with_bitrate(Bitrate::High);

    let message_id = queue.enqueue(&job).await.expect("Failed to enqueue");
    println!("Enqueued job with message ID {}", message_id);

    let deliveries = queue
        .receive_batch("test-consumer", 1, Duration::from_secs(1))
        .await
        .expect("Failed to receive");

    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].job, job);

    queue
        .ack(&deliveries[0].handle)
        .await
        .expect("Failed to ack");
}

/// An empty stream long-polls out cleanly and can be polled again.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_empty_long_poll_returns_no_messages() {
    dotenvy::dotenv().ok();

    // Fresh stream per run so nothing is waiting on it.
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let config = QueueConfig {
        stream_name: format!("vidpress:test:empty:{nonce}"),
        ..QueueConfig::from_env()
    };

    let queue = JobQueue::new(config).expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let first = queue
        .receive_batch("test-consumer-empty", 5, Duration::from_secs(1))
        .await
        .expect("Empty receive must not error");
    assert!(first.is_empty());

    let second = queue
        .receive_batch("test-consumer-empty", 5, Duration::from_secs(1))
        .await
        .expect("Re-poll after empty receive must not error");
    assert!(second.is_empty());
}

/// Dead-lettering moves the message and acknowledges the original.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_dead_letter_path() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = CompressionJob::new("test_user_dlq", "clip.mov").expect("valid envelope");
    queue.enqueue(&job).await.expect("Failed to enqueue");

    let deliveries = queue
        .receive_batch("test-consumer-dlq", 1, Duration::from_secs(1))
        .await
        .expect("Failed to receive");
    assert_eq!(deliveries.len(), 1);

    let dlq_before = queue.dlq_len().await.expect("dlq len");
    queue
        .dead_letter(&deliveries[0].handle, &deliveries[0].job, "engine exited 1")
        .await
        .expect("Failed to dead-letter");
    let dlq_after = queue.dlq_len().await.expect("dlq len");

    assert_eq!(dlq_after, dlq_before + 1);
}

/// Delivery counters increment per attempt and start at zero.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_delivery_counter_tracks_attempts() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let handle = "0-12345";
    assert_eq!(queue.delivery_count(handle).await.expect("count"), 0);
    assert_eq!(queue.increment_deliveries(handle).await.expect("incr"), 1);
    assert_eq!(queue.increment_deliveries(handle).await.expect("incr"), 2);
}
