//! HTTP routes.

mod internal;
mod receipts;
mod tokens;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth;
use crate::state::AppState;

async fn health() -> StatusCode {
    StatusCode::OK
}

pub fn create_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/receipts", post(receipts::upload).get(receipts::list))
        .route(
            "/receipts/{id}",
            get(receipts::get_by_id).delete(receipts::remove),
        )
        .route("/receipts/{id}/download", get(receipts::download))
        .route("/receipts/{id}/status", axum::routing::patch(receipts::update_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let internal_routes = Router::new()
        .route(
            "/internal/receipts/{id}/extracted",
            post(internal::attach_extracted),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_internal_token,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/access-token", post(tokens::issue))
        .merge(user_routes)
        .merge(internal_routes)
        .with_state(state)
}
