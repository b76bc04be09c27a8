//! Model artifact and prediction seam
//!
//! The artifact is a JSON document holding the ordered feature columns and
//! one fitted coefficient per column:
//!
//! ```json
//! { "columns": ["const", "artistPopularity", "Genre_Pop"],
//!   "coefficients": [12.5, 0.61, 4.2] }
//! ```
//!
//! A missing or malformed artifact is fatal: nothing can be served without it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::features::EncodedMatrix;
use crate::{Error, Result};

/// Serialized trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature schema, in the order the coefficients apply
    pub columns: Vec<String>,
    pub coefficients: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ModelArtifact {
    /// Load and validate an artifact from disk
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::ModelArtifact(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let artifact = Self::from_json_str(&text).map_err(|e| match e {
            Error::ModelArtifact(msg) => {
                Error::ModelArtifact(format!("'{}': {}", path.display(), msg))
            }
            other => other,
        })?;
        info!(
            "Loaded model artifact {} ({} columns)",
            path.display(),
            artifact.columns.len()
        );
        Ok(artifact)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(text)
            .map_err(|e| Error::ModelArtifact(format!("malformed artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::ModelArtifact("artifact has no columns".to_string()));
        }
        if self.columns.len() != self.coefficients.len() {
            return Err(Error::ModelArtifact(format!(
                "{} columns but {} coefficients",
                self.columns.len(),
                self.coefficients.len()
            )));
        }
        if let Some(index) = self.coefficients.iter().position(|c| !c.is_finite()) {
            return Err(Error::ModelArtifact(format!(
                "coefficient for '{}' is not finite",
                self.columns[index]
            )));
        }
        Ok(())
    }
}

/// Anything that turns a schema-aligned matrix into one score per row
pub trait PopularityModel: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, matrix: &EncodedMatrix<'_>) -> Result<Vec<f64>>;
}

/// Linear model: each score is the dot product of a row with the coefficients
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    columns: Vec<String>,
    coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self> {
        artifact.validate()?;
        Ok(Self {
            name: artifact.name.clone().unwrap_or_else(|| "linear".to_string()),
            columns: artifact.columns.clone(),
            coefficients: artifact.coefficients.clone(),
        })
    }
}

impl PopularityModel for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, matrix: &EncodedMatrix<'_>) -> Result<Vec<f64>> {
        if matrix.schema().names() != self.columns.as_slice() {
            return Err(Error::InvalidInput(
                "matrix columns do not match the model's feature schema".to_string(),
            ));
        }

        Ok(matrix
            .rows()
            .map(|row| {
                row.iter()
                    .zip(&self.coefficients)
                    .map(|(value, weight)| value * weight)
                    .sum::<f64>()
            })
            .collect())
    }
}
