//! Internal routes for the extraction pipeline.
//!
//! Authenticated by the internal service token, never by user JWTs; see
//! `auth::require_internal_token`.

use axum::extract::{Path, State};
use axum::Json;
use recibo_core::{AccountId, ExtractedData};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachResponse {
    /// Owner of the processed receipt, for the notification step.
    pub owner_id: AccountId,
}

/// `POST /internal/receipts/{id}/extracted`
pub async fn attach_extracted(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<ExtractedData>,
) -> ApiResult<Json<AttachResponse>> {
    let owner_id = state.core.extraction.attach_extracted_data(id, data).await?;
    Ok(Json(AttachResponse { owner_id }))
}
