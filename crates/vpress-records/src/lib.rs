//! DynamoDB-backed result record store for VidPress.
//!
//! A thin typed client: put on job completion, query by owner for the
//! history view, delete on user request. Throttled calls retry in
//! place; everything else is left to the queue's redelivery path.

pub mod client;
pub mod error;
pub mod item;
pub mod retry;

pub use client::{RecordStore, RecordsConfig};
pub use error::{RecordError, RecordResult};
pub use retry::RetryConfig;
