//! Single-record feature encoder
//!
//! Builds one schema-aligned feature vector from the interactive inputs.
//! The categorical part goes through [`categorical_flags`], which the batch
//! encoder uses as well, so both paths bin durations and pick dummies the
//! same way.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::batch::BatchColumns;
use crate::duration::DurationBin;
use crate::features::{CategoricalFlag, EncodedRecord, SparseRecord};
use crate::schema::FeatureSchema;

/// Interactive song description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongInputs {
    /// Artist fame, nominally 0-100
    pub fame: f64,
    /// Previous track popularity, nominally 0-100
    pub momentum: f64,
    pub duration_minutes: f64,
    pub genre: String,
}

/// Categorical levels activated by a genre label and a duration
///
/// Flags are schema-independent; reconciliation later drops those whose
/// column the model does not have.
pub fn categorical_flags(genre: Option<&str>, minutes: Option<f64>) -> BTreeSet<CategoricalFlag> {
    let mut flags = BTreeSet::new();
    if let Some(genre) = genre.filter(|g| !g.is_empty()) {
        flags.insert(CategoricalFlag::Genre(genre.to_string()));
    }
    if let Some(bin) = minutes.and_then(DurationBin::from_minutes) {
        flags.insert(CategoricalFlag::Duration(bin));
    }
    flags
}

/// Encoder bound to one feature schema
#[derive(Debug, Clone)]
pub struct FeatureEncoder<'s> {
    pub(crate) schema: &'s FeatureSchema,
    pub(crate) batch_columns: BatchColumns,
}

impl<'s> FeatureEncoder<'s> {
    pub fn new(schema: &'s FeatureSchema) -> Self {
        Self {
            schema,
            batch_columns: BatchColumns::default(),
        }
    }

    pub fn with_batch_columns(mut self, batch_columns: BatchColumns) -> Self {
        self.batch_columns = batch_columns;
        self
    }

    pub fn schema(&self) -> &'s FeatureSchema {
        self.schema
    }

    /// Structured form of the interactive inputs
    pub fn sparse(inputs: &SongInputs) -> SparseRecord {
        SparseRecord {
            fame: Some(inputs.fame),
            momentum: Some(inputs.momentum),
            extra: Default::default(),
            flags: categorical_flags(Some(&inputs.genre), Some(inputs.duration_minutes)),
        }
    }

    /// Encode one song
    ///
    /// Never fails: fame and momentum are copied unclamped, unknown genres
    /// and absent dummy columns resolve to the reference level.
    pub fn encode(&self, inputs: &SongInputs) -> EncodedRecord<'s> {
        let record = Self::sparse(inputs);
        for flag in &record.flags {
            if let Some(column) = flag.column_name() {
                if !self.schema.is_known(&column) {
                    debug!("Column '{}' not in schema, treating as reference level", column);
                }
            }
        }
        self.schema.reconcile(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CONST_COLUMN, FAME_COLUMN, MOMENTUM_COLUMN};

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn inputs(fame: f64, momentum: f64, minutes: f64, genre: &str) -> SongInputs {
        SongInputs {
            fame,
            momentum,
            duration_minutes: minutes,
            genre: genre.to_string(),
        }
    }

    #[test]
    fn test_pop_standard_song() {
        let schema = schema(&[
            "const",
            "artistPopularity",
            "prevTrackPopularity",
            "Genre_Pop",
            "Duration_Standard",
        ]);
        let encoder = FeatureEncoder::new(&schema);
        let record = encoder.encode(&inputs(70.0, 55.0, 3.5, "Pop"));
        assert_eq!(record.values(), &[1.0, 70.0, 55.0, 1.0, 1.0]);
    }

    #[test]
    fn test_unknown_genre_leaves_genre_dummies_zero() {
        let schema = schema(&[
            "const",
            "artistPopularity",
            "prevTrackPopularity",
            "Genre_Pop",
            "Duration_Standard",
        ]);
        let encoder = FeatureEncoder::new(&schema);
        let record = encoder.encode(&inputs(70.0, 55.0, 3.5, "Jazz"));
        assert_eq!(record.get("Genre_Pop"), Some(0.0));
        assert_eq!(record.get("Duration_Standard"), Some(1.0));
        assert_eq!(record.get(CONST_COLUMN), Some(1.0));
    }

    #[test]
    fn test_very_short_never_activates() {
        let schema = schema(&[
            "Duration_Very Short",
            "Duration_Short",
            "Duration_Standard",
            "Duration_Long",
            "Duration_Very Long",
        ]);
        let encoder = FeatureEncoder::new(&schema);
        let record = encoder.encode(&inputs(10.0, 10.0, 1.0, "Pop"));
        assert!(record.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_missing_columns_are_skipped() {
        let schema = schema(&["Genre_Rock"]);
        let encoder = FeatureEncoder::new(&schema);
        let record = encoder.encode(&inputs(50.0, 50.0, 3.5, "Pop"));
        assert_eq!(record.len(), 1);
        assert_eq!(record.get(FAME_COLUMN), None);
        assert_eq!(record.values(), &[0.0]);
    }

    #[test]
    fn test_continuous_inputs_are_not_clamped() {
        let schema = schema(&["artistPopularity", "prevTrackPopularity"]);
        let encoder = FeatureEncoder::new(&schema);
        let record = encoder.encode(&inputs(250.0, -5.0, 3.0, "Pop"));
        assert_eq!(record.get(FAME_COLUMN), Some(250.0));
        assert_eq!(record.get(MOMENTUM_COLUMN), Some(-5.0));
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let schema = schema(&["const", "artistPopularity", "Genre_Pop", "Duration_Long"]);
        let encoder = FeatureEncoder::new(&schema);
        let song = inputs(42.0, 17.0, 5.0, "Pop");
        assert_eq!(encoder.encode(&song), encoder.encode(&song));
    }

    #[test]
    fn test_categorical_flags() {
        let flags = categorical_flags(Some("Rock"), Some(2.0));
        assert!(flags.contains(&CategoricalFlag::Genre("Rock".into())));
        assert!(flags.contains(&CategoricalFlag::Duration(DurationBin::Short)));

        assert!(categorical_flags(Some(""), None).is_empty());
        assert!(categorical_flags(None, Some(-1.0)).is_empty());
    }
}
