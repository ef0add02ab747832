//! Submission gateway core.
//!
//! The synchronous half of the pipeline: validate the parameter set,
//! store the original, build the envelope, enqueue it. Success is
//! reported only after the enqueue acknowledgment. If the enqueue
//! fails after the object write succeeded, the orphaned object is left
//! in place; it is never referenced and a compensating delete could
//! itself fail.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use vpress_models::{Bitrate, CompressionJob, FrameRate, OutputFormat, ParamError, Resolution};
use vpress_storage::source_key;

use crate::error::ApiResult;
use crate::state::AppState;

/// Raw parameter strings from the request, before domain validation.
#[derive(Debug, Clone, Default)]
pub struct RawParams {
    pub format: Option<String>,
    pub resolution: Option<String>,
    pub bitrate: Option<String>,
    pub frame_rate: Option<String>,
}

impl RawParams {
    /// Validate each field against its domain, substituting defaults
    /// for omissions. Rejection happens here, before anything is
    /// stored or enqueued.
    pub fn resolve(&self) -> Result<ResolvedParams, ParamError> {
        Ok(ResolvedParams {
            format: parse_or_default::<OutputFormat>(self.format.as_deref())?,
            resolution: parse_or_default::<Resolution>(self.resolution.as_deref())?,
            bitrate: parse_or_default::<Bitrate>(self.bitrate.as_deref())?,
            frame_rate: parse_or_default::<FrameRate>(self.frame_rate.as_deref())?,
        })
    }
}

fn parse_or_default<T>(value: Option<&str>) -> Result<T, ParamError>
where
    T: Default + std::str::FromStr<Err = ParamError>,
{
    match value {
        Some(s) if !s.trim().is_empty() => s.trim().parse(),
        _ => Ok(T::default()),
    }
}

/// Parameters after domain validation.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedParams {
    pub format: OutputFormat,
    pub resolution: Resolution,
    pub bitrate: Bitrate,
    pub frame_rate: FrameRate,
}

/// Response body for a successful submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub message: String,
    pub file_name: String,
    pub message_id: String,
}

/// Stored object name: stamp prefix keeps concurrent uploads of the
/// same file name distinct.
pub fn stamped_name(original_name: &str, stamp_millis: i64) -> String {
    format!("{}-{}", stamp_millis, sanitize(original_name))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Content type recorded for an uploaded original.
fn original_content_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some(ext) => ext
            .parse::<OutputFormat>()
            .map(|f| f.content_type())
            .unwrap_or("application/octet-stream"),
        None => "application/octet-stream",
    }
}

/// Run one submission end to end.
pub async fn submit(
    state: &AppState,
    owner: &str,
    original_name: &str,
    data: Vec<u8>,
    raw: &RawParams,
) -> ApiResult<SubmissionReceipt> {
    let params = raw.resolve()?;

    let stored_name = stamped_name(original_name, Utc::now().timestamp_millis());
    let key = source_key(&stored_name);

    state
        .storage
        .upload_bytes(data, &key, original_content_type(original_name))
        .await?;

    let job = CompressionJob::new(owner, stored_name.clone())?
        .with_format(params.format)
        .with_resolution(params.resolution)
        .with_bitrate(params.bitrate)
        .with_frame_rate(params.frame_rate);

    let message_id = state.queue.enqueue(&job).await?;

    info!(
        username = %owner,
        file = %stored_name,
        message_id = %message_id,
        "Submission accepted"
    );

    Ok(SubmissionReceipt {
        message: "File uploaded successfully and processing job queued.".to_string(),
        file_name: stored_name,
        message_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_params_resolve_to_defaults() {
        let params = RawParams::default().resolve().unwrap();
        assert_eq!(params.format, OutputFormat::Mp4);
        assert_eq!(params.resolution, Resolution::P720);
        assert_eq!(params.bitrate, Bitrate::Medium);
        assert_eq!(params.frame_rate, FrameRate::Fps30);
    }

    #[test]
    fn test_out_of_domain_param_is_rejected_before_anything_runs() {
        let raw = RawParams {
            resolution: Some("4k".to_string()),
            ..Default::default()
        };
        let err = raw.resolve().unwrap_err();
        assert_eq!(err.field, "resolution");
    }

    #[test]
    fn test_blank_params_count_as_omitted() {
        let raw = RawParams {
            bitrate: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(raw.resolve().unwrap().bitrate, Bitrate::Medium);
    }

    #[test]
    fn test_explicit_params_survive_resolution() {
        let raw = RawParams {
            format: Some("webm".to_string()),
            resolution: Some("360p".to_string()),
            bitrate: Some("high".to_string()),
            frame_rate: Some("60".to_string()),
        };
        let params = raw.resolve().unwrap();
        assert_eq!(params.format, OutputFormat::Webm);
        assert_eq!(params.resolution, Resolution::P360);
        assert_eq!(params.bitrate, Bitrate::High);
        assert_eq!(params.frame_rate, FrameRate::Fps60);
    }

    #[test]
    fn test_stamped_names_are_distinct_and_safe() {
        assert_ne!(stamped_name("clip.mov", 1), stamped_name("clip.mov", 2));
        assert_eq!(stamped_name("my clip?.mov", 5), "5-my_clip_.mov");
    }

    #[test]
    fn test_original_content_type_from_extension() {
        assert_eq!(original_content_type("a.mp4"), "video/mp4");
        assert_eq!(original_content_type("a.webm"), "video/webm");
        assert_eq!(original_content_type("a.mkv"), "application/octet-stream");
        assert_eq!(original_content_type("noext"), "application/octet-stream");
    }
}
