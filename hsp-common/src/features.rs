//! Intermediate and encoded feature representations
//!
//! Encoders first describe a song as a [`SparseRecord`]: the continuous
//! values they know plus a set of activated categorical flags. Only the
//! reconciliation step turns that into raw schema column names, producing an
//! [`EncodedRecord`] (one row) or an [`EncodedMatrix`] (many rows) whose
//! columns are exactly the feature schema, in schema order.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::duration::DurationBin;
use crate::genre::genre_column;
use crate::schema::FeatureSchema;

/// An activated categorical level
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoricalFlag {
    Genre(String),
    Duration(DurationBin),
}

impl CategoricalFlag {
    /// Dummy column this flag would set, `None` for a reference level
    pub fn column_name(&self) -> Option<String> {
        match self {
            CategoricalFlag::Genre(label) if label.is_empty() => None,
            CategoricalFlag::Genre(label) => Some(genre_column(label)),
            CategoricalFlag::Duration(bin) => bin.dummy_column(),
        }
    }
}

/// Structured description of one song before schema alignment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseRecord {
    pub fame: Option<f64>,
    pub momentum: Option<f64>,
    /// Other numeric inputs addressed by their schema column name
    pub extra: BTreeMap<String, f64>,
    pub flags: BTreeSet<CategoricalFlag>,
}

/// One schema-aligned feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord<'s> {
    schema: &'s FeatureSchema,
    values: Vec<f64>,
}

impl<'s> EncodedRecord<'s> {
    pub(crate) fn zeros(schema: &'s FeatureSchema) -> Self {
        Self {
            schema,
            values: vec![0.0; schema.len()],
        }
    }

    /// Set a column if the schema has it; unknown names are ignored
    pub(crate) fn set(&mut self, name: &str, value: f64) -> bool {
        match self.schema.position(name) {
            Some(position) => {
                self.values[position] = value;
                true
            }
            None => false,
        }
    }

    pub fn schema(&self) -> &'s FeatureSchema {
        self.schema
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|p| self.values[p])
    }

    /// Values in schema order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(column, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.schema.iter().zip(self.values.iter().copied())
    }
}

impl Serialize for EncodedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Schema-aligned feature matrix, one row per input record
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMatrix<'s> {
    schema: &'s FeatureSchema,
    rows: Vec<Vec<f64>>,
}

impl<'s> EncodedMatrix<'s> {
    /// All-zero matrix shaped `n_rows × schema`
    pub(crate) fn zeros(schema: &'s FeatureSchema, n_rows: usize) -> Self {
        Self {
            schema,
            rows: vec![vec![0.0; schema.len()]; n_rows],
        }
    }

    pub fn from_records(schema: &'s FeatureSchema, records: Vec<EncodedRecord<'s>>) -> Self {
        Self {
            schema,
            rows: records.into_iter().map(|r| r.values).collect(),
        }
    }

    /// Overwrite a whole column; returns false if the schema lacks it
    pub(crate) fn set_column(&mut self, name: &str, values: &[f64]) -> bool {
        let Some(position) = self.schema.position(name) else {
            return false;
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[position] = *value;
        }
        true
    }

    pub(crate) fn fill_column(&mut self, name: &str, value: f64) -> bool {
        let Some(position) = self.schema.position(name) else {
            return false;
        };
        for row in &mut self.rows {
            row[position] = value;
        }
        true
    }

    pub fn schema(&self) -> &'s FeatureSchema {
        self.schema
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.schema.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn row(&self, index: usize) -> Option<EncodedRecord<'s>> {
        self.rows.get(index).map(|values| EncodedRecord {
            schema: self.schema,
            values: values.clone(),
        })
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let position = self.schema.position(name)?;
        Some(self.rows.iter().map(|row| row[position]).collect())
    }
}
