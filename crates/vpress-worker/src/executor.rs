//! Job executor.
//!
//! The polling engine: long-poll receive of a bounded batch, dispatch
//! under a concurrency semaphore, acknowledge only after the full
//! pipeline (including cleanup) succeeds. A failed message is left
//! pending so the visibility window redelivers it; a message that
//! exhausts its retry budget is dead-lettered. One bad job never
//! stops the loop.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vpress_queue::{Delivery, JobQueue};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::processor::{process_job, ProcessingContext};

/// Slack on top of the transform timeout for download, upload, and
/// persist time when checking the visibility window.
const VISIBILITY_HEADROOM: Duration = Duration::from_secs(60);

/// The visibility window is the mutual-exclusion mechanism between
/// workers: a message must never be claimable while its owner could
/// still legitimately be processing it.
fn validate_visibility_window(
    transform_timeout: Duration,
    visibility_timeout: Duration,
) -> WorkerResult<()> {
    if visibility_timeout <= transform_timeout + VISIBILITY_HEADROOM {
        return Err(WorkerError::config(format!(
            "visibility timeout ({}s) must exceed transform timeout ({}s) plus {}s headroom, \
             or an in-flight job can be claimed by a second worker",
            visibility_timeout.as_secs(),
            transform_timeout.as_secs(),
            VISIBILITY_HEADROOM.as_secs(),
        )));
    }
    Ok(())
}

/// True when a message has been delivered more times than the budget
/// allows. Counted at receipt, so attempts that died mid-processing
/// (killed worker, OOM) still consume budget on redelivery.
fn budget_exhausted(attempts: u32, max_retries: u32) -> bool {
    attempts > max_retries
}

/// Job executor that processes messages from the queue.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: JobQueue) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor. Runs until shutdown is signalled.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        validate_visibility_window(
            self.config.transform_timeout,
            self.queue.visibility_timeout(),
        )?;

        self.queue.init().await?;

        let ctx = Arc::new(ProcessingContext::new(self.config.clone()).await?);

        let mut shutdown_rx = self.shutdown.subscribe();

        // Periodically rescue messages from crashed workers.
        let claim_task = self.spawn_claim_task(Arc::clone(&ctx));

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_batch(&ctx) => {
                    if let Err(e) = result {
                        error!("Error receiving from queue: {}", e);
                        tokio::time::sleep(self.config.error_backoff).await;
                    }
                }
            }
        }

        claim_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// One long-poll receive followed by dispatch.
    ///
    /// An empty receive is not an error; the loop simply polls again.
    async fn consume_batch(&self, ctx: &Arc<ProcessingContext>) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy; wait for one to free up rather than
            // receiving messages we cannot start.
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let deliveries = self
            .queue
            .receive_batch(
                &self.consumer_name,
                available.min(self.config.batch_size),
                self.config.long_poll,
            )
            .await?;

        if deliveries.is_empty() {
            return Ok(());
        }

        debug!("Received {} messages", deliveries.len());
        self.dispatch(ctx, deliveries).await
    }

    /// Spawn each delivery onto its own task under the semaphore.
    async fn dispatch(
        &self,
        ctx: &Arc<ProcessingContext>,
        deliveries: Vec<Delivery>,
    ) -> WorkerResult<()> {
        for delivery in deliveries {
            let ctx = Arc::clone(ctx);
            let queue = Arc::clone(&self.queue);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute(ctx, queue, delivery).await;
            });
        }
        Ok(())
    }

    /// Execute one message with acknowledge/retry/DLQ handling.
    async fn execute(ctx: Arc<ProcessingContext>, queue: Arc<JobQueue>, delivery: Delivery) {
        let Delivery { handle, job } = delivery;

        // Count the delivery before processing starts. An attempt that
        // never reaches the error path (worker killed mid-transform)
        // still shows up in the counter when the message comes back.
        let attempts = match queue.increment_deliveries(&handle).await {
            Ok(n) => n,
            Err(e) => {
                error!("Failed to count delivery of {}: {}", handle, e);
                1
            }
        };
        let max_retries = queue.max_retries();

        if budget_exhausted(attempts, max_retries) {
            warn!(
                "Message {} redelivered {} times against a budget of {}, dead-lettering",
                handle, attempts, max_retries
            );
            counter!("vidpress_jobs_dead_lettered").increment(1);
            if let Err(e) = queue
                .dead_letter(&handle, &job, "retry budget exhausted")
                .await
            {
                error!("Failed to dead-letter message {}: {}", handle, e);
            }
            return;
        }

        info!("Executing {} (attempt {}/{})", job, attempts, max_retries);

        match process_job(&ctx, &job).await {
            Ok(()) => {
                counter!("vidpress_jobs_completed").increment(1);
                // CLEANING_UP -> ACKNOWLEDGED: everything, including
                // temp file removal, has succeeded by this point.
                if let Err(e) = queue.ack(&handle).await {
                    // The work is durable; the visibility window will
                    // redeliver and the retry lands on fresh keys.
                    error!("Failed to ack completed message {}: {}", handle, e);
                }
            }
            Err(e) => {
                counter!("vidpress_jobs_failed").increment(1);
                error!("Job for {} failed: {}", job.username, e);

                if attempts >= max_retries || !e.is_retryable() {
                    warn!(
                        "Message {} exhausted {} attempts, dead-lettering",
                        handle, attempts
                    );
                    counter!("vidpress_jobs_dead_lettered").increment(1);
                    if let Err(dlq_err) = queue.dead_letter(&handle, &job, &e.to_string()).await {
                        error!("Failed to dead-letter message {}: {}", handle, dlq_err);
                    }
                } else {
                    info!(
                        "Message {} left for redelivery (attempt {}/{})",
                        handle, attempts, max_retries
                    );
                }
            }
        }
    }

    fn spawn_claim_task(&self, ctx: Arc<ProcessingContext>) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let consumer_name = self.consumer_name.clone();
        let semaphore = Arc::clone(&self.job_semaphore);
        let claim_interval = self.config.claim_interval;
        let batch_size = self.config.batch_size;
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue.claim_stale(&consumer_name, batch_size).await {
                            Ok(deliveries) if !deliveries.is_empty() => {
                                info!("Claimed {} stale messages", deliveries.len());
                                for delivery in deliveries {
                                    let ctx = Arc::clone(&ctx);
                                    let queue = Arc::clone(&queue);
                                    let Ok(permit) =
                                        semaphore.clone().acquire_owned().await
                                    else {
                                        return;
                                    };
                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute(ctx, queue, delivery).await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Failed to claim stale messages: {}", e);
                            }
                        }
                    }
                }
            }
        })
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpress_queue::QueueConfig;

    #[test]
    fn test_default_visibility_window_covers_default_transform_timeout() {
        let worker = WorkerConfig::default();
        let queue = QueueConfig::default();
        assert!(validate_visibility_window(
            worker.transform_timeout,
            queue.visibility_timeout
        )
        .is_ok());
    }

    #[test]
    fn test_visibility_window_inside_transform_timeout_is_rejected() {
        // A 700s ffmpeg run under a 900s guard must not be claimable
        // at 600s idle by another worker.
        let err = validate_visibility_window(
            Duration::from_secs(900),
            Duration::from_secs(600),
        )
        .unwrap_err();
        assert!(matches!(err, WorkerError::Config(_)));

        // Equal plus exact headroom is still too tight.
        assert!(validate_visibility_window(
            Duration::from_secs(900),
            Duration::from_secs(960),
        )
        .is_err());
    }

    #[test]
    fn test_redeliveries_past_budget_are_refused_before_processing() {
        // A message whose prior attempts all died mid-processing keeps
        // consuming budget at each receipt; the fourth delivery of a
        // budget-3 message goes to the DLQ without another attempt.
        assert!(!budget_exhausted(1, 3));
        assert!(!budget_exhausted(3, 3));
        assert!(budget_exhausted(4, 3));
    }
}
