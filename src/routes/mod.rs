//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the REST endpoints under `/api` and the live-update
//! websocket under `/ws/polls/{id}` on a single Axum router. CORS is wide
//! open: polls are anonymous and browsers may sit behind any dev proxy.

pub mod polls;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/anonymous-id", get(polls::anonymous_id))
        .route("/api/polls", post(polls::create_poll))
        .route("/api/polls/{id}", get(polls::get_poll))
        .route("/api/polls/{id}/vote", post(polls::vote))
        .route("/api/polls/{id}/close", post(polls::close_poll))
        .route("/ws/polls/{id}", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
