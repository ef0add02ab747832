//! Shared data models for the VidPress backend.
//!
//! This crate defines:
//! - The job envelope placed on the queue (`CompressionJob`)
//! - The closed compression parameter domains and their defaults
//! - The durable result record written after a successful job

pub mod job;
pub mod params;
pub mod record;

pub use job::{CompressionJob, EnvelopeError};
pub use params::{Bitrate, FrameRate, OutputFormat, ParamError, Resolution};
pub use record::CompressionRecord;
