//! The online HTTP surface (spec §6): `POST /generate`, `GET /`,
//! `GET /search`.

pub mod error;
pub mod generate;
pub mod liveness;
pub mod search;
pub mod server;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Build the HTTP router. Request/response logging is supplemented via
/// `tower_http`'s trace layer, matching the teacher's convention of a
/// structured logging middleware on the axum stack even though spec.md
/// names no such requirement (no auth/rate-limit layer: out of scope).
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(liveness::check))
        .route("/generate", post(generate::handle))
        .route("/search", get(search::handle))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
