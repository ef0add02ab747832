//! S3 object store client for VidPress.
//!
//! Originals live under `uploads/`, compressed outputs under
//! `compressed-videos/`. The client is constructed once at process
//! start and shared; all mutation goes through single put/delete calls.

pub mod client;
pub mod error;
pub mod keys;

pub use client::{ObjectStore, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use keys::{result_key, source_key, RESULT_PREFIX, SOURCE_PREFIX};
