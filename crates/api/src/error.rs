//! API error responses.
//!
//! Maps the core error taxonomy onto HTTP statuses. Bodies are always
//! `{"error": "..."}`; the quota error additionally carries the numeric
//! allocation so the client can render a precise message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use recibo_core::CoreError;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            ApiError::Core(core) => {
                let status = match core {
                    CoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
                    CoreError::Unauthorized => StatusCode::FORBIDDEN,
                    CoreError::NotFound => StatusCode::NOT_FOUND,
                    CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                    CoreError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
                    CoreError::Conflict { .. } => StatusCode::CONFLICT,
                    CoreError::Transient { .. } => StatusCode::BAD_GATEWAY,
                    CoreError::Orphaned { .. } | CoreError::Database(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };

                let body = match core {
                    CoreError::QuotaExceeded { used, allocation } => json!({
                        "error": core.to_string(),
                        "used": used,
                        "allocation": allocation,
                    }),
                    other => json!({ "error": other.to_string() }),
                };
                (status, body)
            }
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }

        (status, Json(body)).into_response()
    }
}
