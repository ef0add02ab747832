//! Compression entry point.
//!
//! Maps the closed parameter domains to a concrete FFmpeg argument set
//! through total lookup functions: every enum value has a defined
//! mapping, so an envelope that passed submission validation can never
//! fail here on parameter grounds.

use std::path::Path;

use tracing::info;

use vpress_models::CompressionJob;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Video codec used for all outputs.
pub const VIDEO_CODEC: &str = "libx264";
/// Constant rate factor applied on top of the bitrate target.
pub const CRF: u8 = 28;
/// Encoding preset.
pub const PRESET: &str = "fast";

/// Build the FFmpeg command for one job.
pub fn build_command(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    job: &CompressionJob,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .frame_size(job.resolution.dimensions())
        .video_bitrate(job.bitrate.target())
        .frame_rate(job.frame_rate.as_str())
        .video_codec(VIDEO_CODEC)
        .crf(CRF)
        .preset(PRESET)
}

/// Compress `input` into `output` according to the job's parameters.
///
/// Returns only after the engine process has exited; a partial output
/// file is never reported as complete. `timeout_secs` bounds the
/// engine's runtime.
pub async fn compress(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    job: &CompressionJob,
    timeout_secs: u64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::InputNotFound(input.display().to_string()));
    }

    let cmd = build_command(input, output, job);
    FfmpegRunner::new().with_timeout(timeout_secs).run(&cmd).await?;

    info!(
        input = %input.display(),
        output = %output.display(),
        resolution = %job.resolution,
        bitrate = %job.bitrate,
        "Compression finished"
    );

    Ok(())
}
