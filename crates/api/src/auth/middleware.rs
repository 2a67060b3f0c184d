//! Authentication middleware for Axum.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use recibo_core::AccountId;
use serde_json::json;
use subtle::ConstantTimeEq;

use super::jwt::JwtManager;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Extract the authenticated account from request headers, if any.
///
/// Used by the middleware below and directly by routes that tolerate
/// anonymous callers (the access-token issuer).
pub fn account_from_headers(jwt: &JwtManager, headers: &HeaderMap) -> Option<AccountId> {
    let token = bearer_token(headers)?;
    match jwt.verify(token) {
        Ok(claims) => Some(AccountId::new(claims.sub)),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            None
        }
    }
}

fn unauthenticated() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Not authenticated" })),
    )
        .into_response()
}

/// Require a valid identity-provider JWT; inserts [`AccountId`] as a
/// request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match account_from_headers(&state.jwt_manager, request.headers()) {
        Some(account) => {
            request.extensions_mut().insert(account);
            next.run(request).await
        }
        None => unauthenticated(),
    }
}

/// Compare a presented secret against the expected one without leaking
/// the length of the matching prefix through timing. `ct_eq` on slices
/// already treats a length mismatch as unequal.
pub(crate) fn constant_time_token_eq(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Require the internal service token. Gates the extraction callback
/// routes; user JWTs are deliberately not accepted here.
pub async fn require_internal_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match bearer_token(request.headers()) {
        Some(token) if constant_time_token_eq(token, &state.config.internal_api_token) => {
            next.run(request).await
        }
        _ => unauthenticated(),
    }
}
