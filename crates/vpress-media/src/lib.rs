//! FFmpeg invocation for VidPress compression jobs.
//!
//! This crate is the transform adapter: it turns an envelope's
//! enumerated parameters into a concrete engine argument set, runs the
//! engine under a timeout guard, and reports completion only after the
//! process exits.

pub mod command;
pub mod compress;
pub mod error;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use compress::{build_command, compress};
pub use error::{MediaError, MediaResult};
