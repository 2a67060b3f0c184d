//! Receipt routes: upload, query, status, download, delete.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use recibo_core::{AccountId, Receipt, ReceiptStatus, UploadFile, UploadOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `POST /receipts`: multipart batch upload.
///
/// Every part named `file` becomes one batch entry, in submission order.
/// Structural validation, the quota gate, and per-file failure isolation
/// all live in the core's upload orchestrator.
pub async fn upload(
    State(state): State<AppState>,
    Extension(account): Extension<AccountId>,
    mut multipart: Multipart,
) -> ApiResult<Json<Vec<UploadOutcome>>> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read file part: {e}")))?
            .to_vec();

        files.push(UploadFile {
            name,
            mime_type,
            bytes,
        });
    }

    let outcomes = state.core.uploads.ingest(&account, files).await?;
    Ok(Json(outcomes))
}

/// `GET /receipts`: the caller's receipts, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(account): Extension<AccountId>,
) -> ApiResult<Json<Vec<Receipt>>> {
    let receipts = state.core.receipts.list_by_owner(&account).await?;
    Ok(Json(receipts))
}

/// `GET /receipts/{id}`
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(account): Extension<AccountId>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Receipt>> {
    let receipt = state.core.receipts.get_by_id(id, &account).await?;
    Ok(Json(receipt))
}

#[derive(Serialize)]
pub struct DownloadResponse {
    /// `null` when the backing file no longer exists.
    pub url: Option<String>,
}

/// `GET /receipts/{id}/download`
pub async fn download(
    State(state): State<AppState>,
    Extension(account): Extension<AccountId>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DownloadResponse>> {
    let url = state.core.receipts.download_url(id, &account).await?;
    Ok(Json(DownloadResponse { url }))
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: ReceiptStatus,
}

/// `PATCH /receipts/{id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    Extension(account): Extension<AccountId>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> ApiResult<Json<Receipt>> {
    let receipt = state
        .core
        .receipts
        .update_status(id, &account, body.status)
        .await?;
    Ok(Json(receipt))
}

/// `DELETE /receipts/{id}`: removes the record and its backing file.
pub async fn remove(
    State(state): State<AppState>,
    Extension(account): Extension<AccountId>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.core.receipts.delete(id, &account).await?;
    Ok(StatusCode::NO_CONTENT)
}
