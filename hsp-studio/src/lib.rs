//! hsp-studio library - popularity scoring service
//!
//! HTTP surface over the shared `Predictor`: single-song predictions with
//! advice, and batch scoring of uploaded CSV tables.

use std::sync::Arc;

use axum::Router;
use hsp_common::Predictor;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod score;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5790;

/// Application state shared across HTTP handlers
///
/// The predictor is built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(predictor: Arc<Predictor>) -> Self {
        Self { predictor }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/schema", get(api::get_schema))
        .route("/api/genres", get(api::get_genres))
        .route("/api/predict", post(api::predict))
        .route("/api/batch", post(api::score_batch));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
