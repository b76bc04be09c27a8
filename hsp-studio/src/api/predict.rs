//! Interactive single-song prediction

use axum::{
    extract::{Query, State},
    Json,
};
use hsp_common::{SinglePrediction, SongInputs};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ApiError;
use crate::AppState;

pub const POPULARITY_RANGE: (i64, i64) = (0, 100);
pub const DURATION_RANGE: (f64, f64) = (0.5, 15.0);

/// POST /api/predict request body
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    /// Artist popularity, 0-100
    pub fame: i64,
    /// Popularity of the artist's previous release, 0-100
    pub momentum: i64,
    /// Track length in minutes
    pub duration: f64,
    pub genre: String,
}

impl PredictRequest {
    /// Range checks live here, at the boundary; the encoder accepts anything
    pub fn validate(&self) -> Result<SongInputs, ApiError> {
        let (lo, hi) = POPULARITY_RANGE;
        for (name, value) in [("fame", self.fame), ("momentum", self.momentum)] {
            if !(lo..=hi).contains(&value) {
                return Err(ApiError::BadRequest(format!(
                    "{} must be between {} and {}, got {}",
                    name, lo, hi, value
                )));
            }
        }

        let (lo, hi) = DURATION_RANGE;
        if !(lo..=hi).contains(&self.duration) {
            return Err(ApiError::BadRequest(format!(
                "duration must be between {} and {} minutes, got {}",
                lo, hi, self.duration
            )));
        }

        Ok(SongInputs {
            fame: self.fame as f64,
            momentum: self.momentum as f64,
            duration_minutes: self.duration,
            genre: self.genre.trim().to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    #[serde(default)]
    pub explain: bool,
}

/// One column of the model input
#[derive(Debug, Serialize)]
pub struct FeatureValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub prediction: SinglePrediction,
    pub advice_message: Option<&'static str>,
    /// Encoded record in schema order, only with `?explain=true`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<Vec<FeatureValue>>,
}

/// POST /api/predict
pub async fn predict(
    State(state): State<AppState>,
    Query(query): Query<PredictQuery>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let inputs = request.validate()?;
    let prediction = state.predictor.predict_single(&inputs)?;

    debug!(
        "Predicted {:.1} ({}) for genre '{}'",
        prediction.score, prediction.tier, inputs.genre
    );

    let explain = query.explain.then(|| {
        state
            .predictor
            .explain(&inputs)
            .iter()
            .map(|(name, value)| FeatureValue {
                name: name.to_string(),
                value,
            })
            .collect()
    });

    Ok(Json(PredictResponse {
        advice_message: prediction.advice.message(),
        prediction,
        explain,
    }))
}
