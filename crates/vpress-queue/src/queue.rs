//! Job queue using Redis Streams.
//!
//! Consumer groups give the at-least-once contract: a received entry
//! stays pending (invisible to XREADGROUP on `>`) until acknowledged,
//! and entries whose consumer went quiet past the visibility window are
//! reclaimed with XCLAIM. The queue is the sole authority on delivery
//! state; workers only ever receive, acknowledge, or dead-letter.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use vpress_models::CompressionJob;

use crate::error::{QueueError, QueueResult};

/// One received message: the envelope plus its delivery handle.
///
/// The handle (stream entry ID) is opaque to the worker; it is used
/// only to acknowledge or dead-letter the message.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub handle: String,
    pub job: CompressionJob,
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
    /// Max deliveries before DLQ
    pub max_retries: u32,
    /// Visibility window: how long a received message stays owned by
    /// one consumer before it can be reclaimed. Must exceed the
    /// longest legitimate processing time, or a slow job gets claimed
    /// by a second worker while the first is still on it.
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vidpress:jobs".to_string(),
            consumer_group: "vidpress:workers".to_string(),
            dlq_stream_name: "vidpress:dlq".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(1200),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or(defaults.consumer_group),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or(defaults.dlq_stream_name),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1200),
            ),
        }
    }
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue an envelope. Returns the queue-assigned message ID.
    pub async fn enqueue(&self, job: &CompressionJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(
            username = %job.username,
            file = %job.file_name,
            message_id = %message_id,
            "Enqueued compression job"
        );

        Ok(message_id)
    }

    /// Long-poll receive of up to `max_messages` new messages.
    ///
    /// Blocks for at most `long_poll` before returning, possibly empty.
    /// Received messages become pending for this consumer until acked.
    pub async fn receive_batch(
        &self,
        consumer_name: &str,
        max_messages: usize,
        long_poll: Duration,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(max_messages)
            .arg("BLOCK")
            .arg(long_poll.as_millis() as u64)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">") // Only messages never delivered to this group
            .query_async(&mut conn)
            .await?;

        let mut deliveries = Vec::new();

        for stream_key in result.keys {
            for entry in stream_key.ids {
                if let Some(delivery) = self.parse_entry(entry.id, &entry.map).await? {
                    deliveries.push(delivery);
                }
            }
        }

        Ok(deliveries)
    }

    /// Reclaim messages whose consumer has been idle past the
    /// visibility window (crashed or hung worker).
    pub async fn claim_stale(
        &self,
        consumer_name: &str,
        max_messages: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pending: redis::streams::StreamPendingReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .query_async(&mut conn)
            .await?;

        if pending.count() == 0 {
            return Ok(Vec::new());
        }

        let min_idle_ms = self.config.visibility_timeout.as_millis() as u64;

        let result: redis::streams::StreamClaimReply = redis::cmd("XCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms)
            .arg("0-0")
            .arg("COUNT")
            .arg(max_messages)
            .query_async(&mut conn)
            .await?;

        let mut deliveries = Vec::new();

        for entry in result.ids {
            if let Some(delivery) = self.parse_entry(entry.id, &entry.map).await? {
                info!(handle = %delivery.handle, "Claimed stale pending message");
                deliveries.push(delivery);
            }
        }

        Ok(deliveries)
    }

    /// Acknowledge a message (delete it from the queue).
    pub async fn ack(&self, handle: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(handle)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(handle)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged message: {}", handle);
        Ok(())
    }

    /// Move a message to the dead letter stream and acknowledge the
    /// original, recording the final error for manual inspection.
    pub async fn dead_letter(
        &self,
        handle: &str,
        job: &CompressionJob,
        error: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(handle)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(handle).await?;

        warn!(
            username = %job.username,
            file = %job.file_name,
            "Moved message to DLQ: {}",
            error
        );
        Ok(())
    }

    /// Delivery count so far for a message (including the first).
    pub async fn delivery_count(&self, handle: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let key = format!("vidpress:deliveries:{handle}");
        let count: Option<u32> = conn.get(&key).await?;
        Ok(count.unwrap_or(0))
    }

    /// Record one more delivery attempt for a message.
    pub async fn increment_deliveries(&self, handle: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let key = format!("vidpress:deliveries:{handle}");
        let count: u32 = conn.incr(&key, 1).await?;
        // Counter outlives any plausible retry cycle, then expires
        conn.expire::<_, ()>(&key, 86400).await?;
        Ok(count)
    }

    /// Queue depth.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Dead letter stream depth.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Max deliveries from config.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Visibility window from config.
    pub fn visibility_timeout(&self) -> Duration {
        self.config.visibility_timeout
    }

    /// Decode one stream entry, acking malformed payloads so they do
    /// not redeliver forever.
    async fn parse_entry(
        &self,
        handle: String,
        map: &std::collections::HashMap<String, redis::Value>,
    ) -> QueueResult<Option<Delivery>> {
        match decode_payload(map) {
            Ok(job) => {
                debug!(handle = %handle, "Received {}", job);
                Ok(Some(Delivery { handle, job }))
            }
            Err(e) => {
                warn!(handle = %handle, "Discarding stream entry: {}", e);
                self.ack(&handle).await.ok();
                Ok(None)
            }
        }
    }
}

/// Decode the envelope carried by a stream entry.
fn decode_payload(
    map: &std::collections::HashMap<String, redis::Value>,
) -> QueueResult<CompressionJob> {
    let Some(redis::Value::BulkString(payload)) = map.get("job") else {
        return Err(QueueError::malformed_payload("entry has no job field"));
    };

    let payload_str = String::from_utf8_lossy(payload);
    serde_json::from_str::<CompressionJob>(&payload_str)
        .map_err(|e| QueueError::malformed_payload(format!("bad job payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.stream_name, "vidpress:jobs");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.visibility_timeout, Duration::from_secs(1200));
    }

    #[test]
    fn test_wire_payload_matches_envelope_shape() {
        // What enqueue writes must be what receive_batch parses.
        let job = CompressionJob::new("alice", "clip.mov").unwrap();
        let payload = serde_json::to_string(&job).unwrap();
        let back: CompressionJob = serde_json::from_str(&payload).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_decode_payload_accepts_enqueued_shape() {
        let job = CompressionJob::new("alice", "clip.mov").unwrap();
        let mut map = std::collections::HashMap::new();
        map.insert(
            "job".to_string(),
            redis::Value::BulkString(serde_json::to_vec(&job).unwrap()),
        );
        assert_eq!(decode_payload(&map).unwrap(), job);
    }

    #[test]
    fn test_decode_payload_flags_missing_job_field() {
        let map = std::collections::HashMap::new();
        let err = decode_payload(&map).unwrap_err();
        assert!(matches!(err, QueueError::MalformedPayload(_)));
    }

    #[test]
    fn test_decode_payload_flags_unparseable_json() {
        let mut map = std::collections::HashMap::new();
        map.insert(
            "job".to_string(),
            redis::Value::BulkString(b"not json".to_vec()),
        );
        let err = decode_payload(&map).unwrap_err();
        assert!(matches!(err, QueueError::MalformedPayload(_)));
    }
}
