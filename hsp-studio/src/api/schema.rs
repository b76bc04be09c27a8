//! Schema inspection endpoints

use axum::{extract::State, Json};
use hsp_common::genre;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    /// Feature columns in the order the model consumes them
    pub columns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenresResponse {
    /// Genres with a dummy column, plus the catch-all, sorted
    pub genres: Vec<String>,
}

/// GET /api/schema
pub async fn get_schema(State(state): State<AppState>) -> Json<SchemaResponse> {
    Json(SchemaResponse {
        columns: state.predictor.schema().names().to_vec(),
    })
}

/// GET /api/genres
pub async fn get_genres(State(state): State<AppState>) -> Json<GenresResponse> {
    Json(GenresResponse {
        genres: genre::genre_choices(state.predictor.schema()),
    })
}
