//! HTTP API handlers for hsp-studio

pub mod batch;
pub mod health;
pub mod predict;
pub mod schema;

pub use batch::score_batch;
pub use health::health_routes;
pub use predict::predict;
pub use schema::{get_genres, get_schema};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Errors surfaced to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    /// Out-of-range or malformed request
    BadRequest(String),
    /// Uploaded table lacks a required column
    MissingField(String),
    Internal(String),
}

impl From<hsp_common::Error> for ApiError {
    fn from(e: hsp_common::Error) -> Self {
        use hsp_common::Error;
        match e {
            Error::MissingField(field) => ApiError::MissingField(field),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Csv(e) => ApiError::BadRequest(format!("Malformed CSV: {}", e)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::MissingField(field) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Missing required column: {}", field),
            ),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
