//! Redis Streams job queue for VidPress.
//!
//! At-least-once delivery with visibility-timeout semantics: a received
//! message is owned by one consumer until acknowledged or until its
//! idle time passes the visibility window, after which another consumer
//! may claim it. Messages that exhaust the retry budget move to a dead
//! letter stream.

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{Delivery, JobQueue, QueueConfig};
