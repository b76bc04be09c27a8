//! Feature schema registry
//!
//! The feature schema is the ordered list of column names the trained model
//! expects. It is derived once from the model artifact and never changes
//! afterwards; every encoded vector follows its order exactly.

use std::collections::HashMap;

use crate::features::{CategoricalFlag, EncodedRecord, SparseRecord};
use crate::genre;
use crate::model::ModelArtifact;
use crate::{Error, Result};

/// Intercept column added by the training pipeline
pub const CONST_COLUMN: &str = "const";

/// Long-term artist popularity ("fame")
pub const FAME_COLUMN: &str = "artistPopularity";

/// Popularity of the artist's previous track ("momentum")
pub const MOMENTUM_COLUMN: &str = "prevTrackPopularity";

/// Ordered, duplicate-free list of model input columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty lists and duplicate names
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::ModelArtifact("feature schema has no columns".to_string()));
        }

        let mut index = HashMap::with_capacity(columns.len());
        for (position, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(Error::ModelArtifact(format!(
                    "duplicate feature column '{}'",
                    name
                )));
            }
        }

        Ok(Self { columns, index })
    }

    pub fn names(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column, exact (case-sensitive) match
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Columns starting with `prefix`, paired with the remainder after it
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.columns
            .iter()
            .filter_map(move |name| name.strip_prefix(prefix).map(|rest| (name.as_str(), rest)))
    }

    /// Project a sparse record onto the schema
    ///
    /// Starts from an all-zero row; every schema column the record names is
    /// filled in, everything the schema does not know is dropped.
    pub fn reconcile(&self, record: &SparseRecord) -> EncodedRecord<'_> {
        let mut encoded = EncodedRecord::zeros(self);

        encoded.set(CONST_COLUMN, 1.0);
        if let Some(fame) = record.fame {
            encoded.set(FAME_COLUMN, fame);
        }
        if let Some(momentum) = record.momentum {
            encoded.set(MOMENTUM_COLUMN, momentum);
        }
        for (name, value) in &record.extra {
            encoded.set(name, *value);
        }
        for flag in &record.flags {
            match flag {
                CategoricalFlag::Genre(label) => {
                    if let Some(column) = genre::dummy_for(label, self) {
                        encoded.set(column, 1.0);
                    }
                }
                CategoricalFlag::Duration(bin) => {
                    if let Some(column) = bin.dummy_column() {
                        encoded.set(&column, 1.0);
                    }
                }
            }
        }

        encoded
    }
}

/// Owner of the process-wide feature schema
///
/// Built once at startup from the model artifact and shared read-only.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schema: FeatureSchema,
}

impl SchemaRegistry {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    /// Derive the schema from a loaded artifact
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self> {
        let schema = FeatureSchema::new(artifact.columns.clone())?;
        tracing::info!("Feature schema loaded: {} columns", schema.len());
        Ok(Self::new(schema))
    }

    pub fn columns(&self) -> &FeatureSchema {
        &self.schema
    }
}
