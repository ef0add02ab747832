//! HTTP handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vpress_models::CompressionRecord;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::submission::{submit, RawParams, SubmissionReceipt};

/// POST /api/upload
///
/// Multipart submission: one `file` part plus optional text parts for
/// the compression parameters. Responds 202 only after the job has
/// been durably enqueued.
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmissionReceipt>)> {
    let mut file_name: Option<String> = None;
    let mut file_data: Option<Vec<u8>> = None;
    let mut params = RawParams::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read file: {e}")))?;
                file_data = Some(data.to_vec());
            }
            "format" => params.format = Some(read_text(field).await?),
            "resolution" => params.resolution = Some(read_text(field).await?),
            "bitrate" => params.bitrate = Some(read_text(field).await?),
            "frameRate" => params.frame_rate = Some(read_text(field).await?),
            other => {
                warn!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    let file_name =
        file_name.ok_or_else(|| ApiError::bad_request("missing file part in upload"))?;
    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file part is empty"))?;
    if file_data.is_empty() {
        return Err(ApiError::bad_request("uploaded file has no content"));
    }

    let receipt = submit(&state, &user.username, &file_name, file_data, &params).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("unreadable multipart field: {e}")))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Admin-only override to view another user's history.
    pub user: Option<String>,
}

/// GET /api/history
///
/// Completed compressions for the caller, newest first. Admins may
/// pass `?user=` to inspect another account.
pub async fn list_videos(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<CompressionRecord>>> {
    let owner = match query.user {
        Some(other) if other != user.username => {
            if !user.is_admin {
                return Err(ApiError::forbidden("cannot view another user's history"));
            }
            other
        }
        _ => user.username.clone(),
    };

    let mut records = state.records.query_by_owner(&owner).await?;
    records.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
    Ok(Json(records))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub download_url: String,
    pub expires_in_secs: u64,
}

/// GET /api/download/{filename}
///
/// Presigned URL for a compressed output the caller owns.
pub async fn download_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(filename): Path<String>,
) -> ApiResult<Json<DownloadResponse>> {
    let record = state
        .records
        .get_record(&user.username, &filename)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no compressed video named {filename}")))?;

    let url = state
        .storage
        .presign_get(&record.s3_key, state.config.download_url_ttl)
        .await?;

    Ok(Json(DownloadResponse {
        download_url: url,
        expires_in_secs: state.config.download_url_ttl.as_secs(),
    }))
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    message: String,
}

/// DELETE /api/videos/{filename}
///
/// Remove a compressed output and its record. Ownership is enforced
/// by keying the record lookup on the caller's username.
pub async fn delete_video(
    State(state): State<AppState>,
    user: AuthUser,
    Path(filename): Path<String>,
) -> ApiResult<Json<impl Serialize>> {
    let record = state
        .records
        .get_record(&user.username, &filename)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no compressed video named {filename}")))?;

    state.storage.delete_object(&record.s3_key).await?;
    state
        .records
        .delete_record(&user.username, &filename)
        .await?;

    info!(username = %user.username, file = %filename, "Deleted compressed video");

    Ok(Json(DeleteResponse {
        message: format!("{filename} deleted"),
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    queue_depth: u64,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<impl Serialize>> {
    let queue_depth = state.queue.len().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        queue_depth,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpress_storage::result_key;

    #[test]
    fn test_download_response_shape() {
        let body = serde_json::to_value(DownloadResponse {
            download_url: "https://example/x".to_string(),
            expires_in_secs: 300,
        })
        .unwrap();
        assert_eq!(body["downloadUrl"], "https://example/x");
        assert_eq!(body["expiresInSecs"], 300);
    }

    #[test]
    fn test_result_key_used_for_outputs() {
        // Records store the full key; the handler must not re-derive it.
        assert_eq!(result_key("a.mp4"), "compressed-videos/a.mp4");
    }
}
