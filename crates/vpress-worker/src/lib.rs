//! Video compression worker.
//!
//! This crate provides:
//! - The polling job executor (long-poll receive, bounded concurrency,
//!   ack-after-cleanup, retry budget with dead-lettering)
//! - The per-message processing pipeline
//! - Per-attempt temporary file management

pub mod config;
pub mod error;
pub mod executor;
pub mod processor;
pub mod temp;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use processor::{process_job, ProcessingContext};
pub use temp::JobWorkspace;
