//! Application state.

use std::sync::Arc;

use vpress_queue::JobQueue;
use vpress_records::RecordStore;
use vpress_storage::ObjectStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<ObjectStore>,
    pub records: Arc<RecordStore>,
    pub queue: Arc<JobQueue>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage = ObjectStore::from_env().await?;
        let records = RecordStore::from_env().await?;
        let queue = JobQueue::from_env()?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            records: Arc::new(records),
            queue: Arc::new(queue),
        })
    }
}
