//! Batch scoring of uploaded CSV tables

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use hsp_common::BatchTable;
use tracing::info;

use super::ApiError;
use crate::AppState;

/// File name offered for the scored download
pub const DOWNLOAD_NAME: &str = "predictions.csv";

/// POST /api/batch
///
/// Body is a CSV table; the response is the same table with a
/// `Predicted_Score` column, highest score first.
pub async fn score_batch(State(state): State<AppState>, body: String) -> Result<Response, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("Empty upload".to_string()));
    }

    let table = BatchTable::from_csv_str(&body)?;
    let rows = table.len();
    let scored = state.predictor.score_batch(table)?;
    let csv = scored.to_csv_string()?;

    info!(
        "Batch upload scored: {} rows, {} malformed cells",
        rows, scored.report.degraded_cells
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_NAME),
            ),
        ],
        csv,
    )
        .into_response())
}
