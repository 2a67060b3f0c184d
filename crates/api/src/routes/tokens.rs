//! Temporary access token route.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::auth::account_from_headers;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct TokenResponse {
    /// `null` when there is no authenticated account to scope a token to.
    pub token: Option<String>,
}

/// `POST /access-token`
///
/// Anonymous callers get `{"token": null}` rather than a 401; the client
/// treats that as "cannot render the embedded entitlement UI".
pub async fn issue(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<TokenResponse>> {
    let account = account_from_headers(&state.jwt_manager, &headers);
    let token = state
        .core
        .tokens
        .issue_access_token(account.as_ref())
        .await?;
    Ok(Json(TokenResponse { token }))
}
