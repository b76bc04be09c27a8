//! Popularity prediction service
//!
//! [`Predictor`] is built once at startup from the model artifact and shared
//! read-only by every request. It ties the schema registry, the encoders and
//! the model together for the two user-facing paths:
//! - single song: clamped score, tier and duration advice
//! - batch: one raw score per row, emitted as CSV sorted by score

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::batch::{BatchColumns, BatchTable, ReconciliationReport};
use crate::duration::{DurationAdvice, DurationBin};
use crate::encoder::{FeatureEncoder, SongInputs};
use crate::features::{EncodedMatrix, EncodedRecord};
use crate::model::{LinearModel, ModelArtifact, PopularityModel};
use crate::schema::{FeatureSchema, SchemaRegistry};
use crate::Result;

/// Bounds of the interactive popularity score
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Column appended to scored batch output
pub const PREDICTED_SCORE_COLUMN: &str = "Predicted_Score";

/// Momentum above this pulls a prediction up
pub const MOMENTUM_PULL_THRESHOLD: f64 = 60.0;

pub fn clamp_score(raw: f64) -> f64 {
    raw.clamp(MIN_SCORE, MAX_SCORE)
}

/// Outcome category for a single prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    #[serde(rename = "Smash Hit")]
    SmashHit,
    #[serde(rename = "Solid Performance")]
    SolidPerformance,
    #[serde(rename = "Risk of Flop")]
    RiskOfFlop,
    #[serde(rename = "Cold Release")]
    ColdRelease,
}

impl Tier {
    pub fn from_score(score: f64) -> Tier {
        if score > 80.0 {
            Tier::SmashHit
        } else if score > 60.0 {
            Tier::SolidPerformance
        } else if score > 40.0 {
            Tier::RiskOfFlop
        } else {
            Tier::ColdRelease
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::SmashHit => "Smash Hit",
            Tier::SolidPerformance => "Solid Performance",
            Tier::RiskOfFlop => "Risk of Flop",
            Tier::ColdRelease => "Cold Release",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumTrend {
    Up,
    Down,
}

impl MomentumTrend {
    pub fn from_momentum(momentum: f64) -> MomentumTrend {
        if momentum > MOMENTUM_PULL_THRESHOLD {
            MomentumTrend::Up
        } else {
            MomentumTrend::Down
        }
    }
}

/// Result of the interactive path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinglePrediction {
    /// Score clamped to `[0, 100]`
    pub score: f64,
    /// Model output before clamping
    pub raw_score: f64,
    pub tier: Tier,
    pub duration_bin: Option<DurationBin>,
    pub advice: DurationAdvice,
    pub momentum_trend: MomentumTrend,
}

/// Uploaded rows with their scores
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBatch {
    headers: Vec<String>,
    rows: Vec<(Vec<String>, f64)>,
    pub report: ReconciliationReport,
}

impl ScoredBatch {
    /// Pair each input row with its score, keeping input order
    pub fn new(table: BatchTable, scores: Vec<f64>, report: ReconciliationReport) -> Self {
        let (headers, rows) = table.into_parts();
        Self {
            headers,
            rows: rows.into_iter().zip(scores).collect(),
            report,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|(_, score)| *score)
    }

    /// Value of `column` in every row, in current row order
    pub fn column(&self, column: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == column)?;
        Some(self.rows.iter().map(|(row, _)| row[index].as_str()).collect())
    }

    /// Sort rows by descending score; ties keep input order
    pub fn sort_by_score_desc(&mut self) {
        self.rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    /// Write all original fields plus the score column
    ///
    /// An existing `Predicted_Score` column is overwritten in place.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let existing = self.headers.iter().position(|h| h == PREDICTED_SCORE_COLUMN);
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut headers = self.headers.clone();
        if existing.is_none() {
            headers.push(PREDICTED_SCORE_COLUMN.to_string());
        }
        csv_writer.write_record(&headers)?;

        for (row, score) in &self.rows {
            let mut record = row.clone();
            match existing {
                Some(index) => record[index] = score.to_string(),
                None => record.push(score.to_string()),
            }
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Process-wide prediction service
pub struct Predictor {
    registry: SchemaRegistry,
    model: Box<dyn PopularityModel>,
    batch_columns: BatchColumns,
}

impl Predictor {
    pub fn new(registry: SchemaRegistry, model: Box<dyn PopularityModel>) -> Self {
        Self {
            registry,
            model,
            batch_columns: BatchColumns::default(),
        }
    }

    /// Build from a loaded artifact using the linear model
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self> {
        let registry = SchemaRegistry::from_artifact(artifact)?;
        let model = LinearModel::from_artifact(artifact)?;
        Ok(Self::new(registry, Box::new(model)))
    }

    /// Load the artifact at `path`; any failure here is fatal for the caller
    pub fn load(path: &Path) -> Result<Self> {
        let artifact = ModelArtifact::load(path)?;
        let predictor = Self::from_artifact(&artifact)?;
        info!("Predictor ready (model: {})", predictor.model.name());
        Ok(predictor)
    }

    pub fn with_batch_columns(mut self, batch_columns: BatchColumns) -> Self {
        self.batch_columns = batch_columns;
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.registry.columns()
    }

    pub fn batch_columns(&self) -> &BatchColumns {
        &self.batch_columns
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn encoder(&self) -> FeatureEncoder<'_> {
        FeatureEncoder::new(self.schema()).with_batch_columns(self.batch_columns.clone())
    }

    /// Exact vector the model sees for these inputs
    pub fn explain(&self, inputs: &SongInputs) -> EncodedRecord<'_> {
        self.encoder().encode(inputs)
    }

    pub fn predict_single(&self, inputs: &SongInputs) -> Result<SinglePrediction> {
        let record = self.explain(inputs);
        let matrix = EncodedMatrix::from_records(self.schema(), vec![record]);
        let raw_score = self.model.predict(&matrix)?.first().copied().unwrap_or(MIN_SCORE);
        let score = clamp_score(raw_score);

        Ok(SinglePrediction {
            score,
            raw_score,
            tier: Tier::from_score(score),
            duration_bin: DurationBin::from_minutes(inputs.duration_minutes),
            advice: DurationAdvice::from_minutes(inputs.duration_minutes),
            momentum_trend: MomentumTrend::from_momentum(inputs.momentum),
        })
    }

    /// Score every row of an uploaded table, sorted by descending score
    pub fn score_batch(&self, table: BatchTable) -> Result<ScoredBatch> {
        let encoding = self.encoder().encode_batch(&table)?;
        let scores = self.model.predict(&encoding.matrix)?;
        info!(
            "Scored batch of {} rows ({} unknown columns dropped)",
            scores.len(),
            encoding.report.dropped.len()
        );

        let mut scored = ScoredBatch::new(table, scores, encoding.report);
        scored.sort_by_score_desc();
        Ok(scored)
    }
}
