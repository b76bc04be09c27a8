//! Batch alignment encoder
//!
//! Encodes an uploaded table of songs into a feature matrix aligned with the
//! model schema. The table's columns are untrusted: it may carry genres the
//! model never saw, miss genres the model knows, and bring any number of
//! unrelated fields. The output column set and order come from the schema
//! alone.
//!
//! Steps:
//! 1. Derive minutes per row (from milliseconds when no minutes column exists)
//! 2. Bin each row's duration
//! 3. Expand genre and duration bin into one-hot columns over the values the
//!    batch actually contains
//! 4. Reconcile against the schema: copy shared columns, zero-fill the rest,
//!    drop columns the schema does not know
//! 5. Set the constant column

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::duration::{DurationBin, DURATION_PREFIX};
use crate::encoder::{categorical_flags, FeatureEncoder};
use crate::features::{EncodedMatrix, SparseRecord};
use crate::genre::GENRE_PREFIX;
use crate::schema::{FeatureSchema, CONST_COLUMN, FAME_COLUMN, MOMENTUM_COLUMN};
use crate::{Error, Result};

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Names of the structural columns in an uploaded table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchColumns {
    pub genre: String,
    pub minutes: String,
    pub millis: String,
    pub track_name: String,
    pub artist_name: String,
}

impl Default for BatchColumns {
    fn default() -> Self {
        Self {
            genre: "primaryGenreName".to_string(),
            minutes: "durationMins".to_string(),
            millis: "trackTimeMillis".to_string(),
            track_name: "trackName".to_string(),
            artist_name: "artistName".to_string(),
        }
    }
}

/// Loosely typed tabular input: a header row and string cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl BatchTable {
    /// Build a table; every row must have one cell per header
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(Error::InvalidInput(format!(
                "row {} has {} fields, expected {}",
                index + 1,
                row.len(),
                headers.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::new(headers, rows)
    }

    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_csv_reader(text.as_bytes())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first header named `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.headers, self.rows)
    }
}

/// What reconciliation did with the batch's columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Columns present in both the expanded batch and the schema
    pub matched: Vec<String>,
    /// Batch columns the schema does not know (e.g. unseen genres)
    pub dropped: Vec<String>,
    /// Schema columns the batch did not produce, left at 0
    pub zero_filled: Vec<String>,
    /// Numeric cells that failed to parse and were treated as baseline
    pub degraded_cells: usize,
}

/// Result of encoding a batch
#[derive(Debug, Clone)]
pub struct BatchEncoding<'s> {
    pub matrix: EncodedMatrix<'s>,
    /// Duration bin per row, `None` where no duration could be derived
    pub bins: Vec<Option<DurationBin>>,
    pub report: ReconciliationReport,
}

/// One-hot expansion of a batch over its own observed values
///
/// May contain columns the schema lacks and lack columns the schema has.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedBatch {
    n_rows: usize,
    columns: BTreeMap<String, Vec<f64>>,
}

impl ExpandedBatch {
    pub fn from_records(records: &[SparseRecord]) -> Self {
        let n_rows = records.len();
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for (row, record) in records.iter().enumerate() {
            let mut put = |name: &str, value: f64| {
                columns
                    .entry(name.to_string())
                    .or_insert_with(|| vec![0.0; n_rows])[row] = value;
            };

            if let Some(fame) = record.fame {
                put(FAME_COLUMN, fame);
            }
            if let Some(momentum) = record.momentum {
                put(MOMENTUM_COLUMN, momentum);
            }
            for (name, value) in &record.extra {
                put(name.as_str(), *value);
            }
            for flag in &record.flags {
                if let Some(column) = flag.column_name() {
                    put(column.as_str(), 1.0);
                }
            }
        }

        Self { n_rows, columns }
    }

    /// Project onto `schema`; the schema alone decides columns and order
    pub fn reconcile<'s>(&self, schema: &'s FeatureSchema) -> (EncodedMatrix<'s>, ReconciliationReport) {
        let mut matrix = EncodedMatrix::zeros(schema, self.n_rows);
        let mut report = ReconciliationReport::default();

        for (name, values) in &self.columns {
            if matrix.set_column(name, values) {
                report.matched.push(name.clone());
            } else {
                report.dropped.push(name.clone());
            }
        }

        report.zero_filled = schema
            .iter()
            .filter(|name| *name != CONST_COLUMN && !self.columns.contains_key(*name))
            .map(str::to_string)
            .collect();

        matrix.fill_column(CONST_COLUMN, 1.0);

        (matrix, report)
    }
}

/// Parse a numeric cell; empty, malformed and non-finite cells yield `None`
fn parse_cell(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Where each row's duration in minutes comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationSource {
    Minutes(usize),
    Millis(usize),
}

impl<'s> FeatureEncoder<'s> {
    /// Encode an uploaded table into a schema-aligned matrix
    ///
    /// Fails only when a structural column (genre, or any duration source)
    /// is absent from the table. Row count and order are preserved.
    pub fn encode_batch(&self, table: &BatchTable) -> Result<BatchEncoding<'s>> {
        let cols = &self.batch_columns;

        let genre_index = table
            .column_index(&cols.genre)
            .ok_or_else(|| Error::MissingField(cols.genre.clone()))?;

        // Milliseconds are only used when no minutes column exists
        let source = match (table.column_index(&cols.minutes), table.column_index(&cols.millis)) {
            (Some(minutes), _) => DurationSource::Minutes(minutes),
            (None, Some(millis)) => DurationSource::Millis(millis),
            (None, None) => {
                return Err(Error::MissingField(format!("{} or {}", cols.minutes, cols.millis)))
            }
        };

        for identifying in [&cols.track_name, &cols.artist_name] {
            if !table.has_column(identifying) {
                debug!("Batch has no '{}' column", identifying);
            }
        }

        let minutes_index = match source {
            DurationSource::Minutes(index) => Some(index),
            DurationSource::Millis(_) => None,
        };
        let source_name = match source {
            DurationSource::Minutes(_) => cols.minutes.as_str(),
            DurationSource::Millis(_) => cols.millis.as_str(),
        };
        // Derived minutes feed the schema too, whichever field they came from
        let minutes_known = self.schema.is_known(&cols.minutes);

        // Numeric pass-through: any header the schema also names, except
        // categorical dummies, which are always derived from the raw fields
        let passthrough: Vec<(usize, &str)> = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(index, name)| {
                *index != genre_index
                    && Some(*index) != minutes_index
                    && name.as_str() != CONST_COLUMN
                    && !name.starts_with(GENRE_PREFIX)
                    && !name.starts_with(DURATION_PREFIX)
                    && self.schema.is_known(name)
            })
            .map(|(index, name)| (index, name.as_str()))
            .collect();

        let mut degraded_cells = 0usize;
        let mut degraded_columns: BTreeSet<&str> = BTreeSet::new();
        let mut records = Vec::with_capacity(table.len());
        let mut bins = Vec::with_capacity(table.len());

        for row in table.rows() {
            let minutes = match source {
                DurationSource::Minutes(index) => parse_cell(&row[index]),
                DurationSource::Millis(index) => parse_cell(&row[index]).map(|ms| ms / MILLIS_PER_MINUTE),
            };
            if minutes.is_none() {
                degraded_cells += 1;
                degraded_columns.insert(source_name);
            }
            let bin = minutes.and_then(DurationBin::from_minutes);
            bins.push(bin);

            let mut record = SparseRecord {
                flags: categorical_flags(Some(row[genre_index].as_str()), minutes),
                ..SparseRecord::default()
            };
            if minutes_known {
                record.extra.insert(cols.minutes.clone(), minutes.unwrap_or(0.0));
            }

            for (index, name) in &passthrough {
                let value = match parse_cell(&row[*index]) {
                    Some(value) => value,
                    None => {
                        degraded_cells += 1;
                        degraded_columns.insert(*name);
                        0.0
                    }
                };
                match *name {
                    FAME_COLUMN => record.fame = Some(value),
                    MOMENTUM_COLUMN => record.momentum = Some(value),
                    other => {
                        record.extra.insert(other.to_string(), value);
                    }
                }
            }

            records.push(record);
        }

        for column in &degraded_columns {
            warn!("Column '{}' has non-numeric cells, using 0 for those rows", column);
        }

        let expanded = ExpandedBatch::from_records(&records);
        let (matrix, mut report) = expanded.reconcile(self.schema);
        report.degraded_cells = degraded_cells;

        debug!(
            "Batch of {} rows reconciled: {} matched, {} dropped {:?}, {} zero-filled",
            matrix.n_rows(),
            report.matched.len(),
            report.dropped.len(),
            report.dropped,
            report.zero_filled.len()
        );

        Ok(BatchEncoding {
            matrix,
            bins,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            [
                "const",
                "artistPopularity",
                "prevTrackPopularity",
                "Genre_Pop",
                "Genre_Rock",
                "Duration_Short",
                "Duration_Standard",
                "Duration_Long",
                "Duration_Very Long",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_table_rejects_ragged_rows() {
        let result = BatchTable::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into()]],
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_millis_derive_minutes() {
        let schema = schema();
        let table = BatchTable::from_csv_str("trackName,primaryGenreName,trackTimeMillis\nA,Pop,210000\n").unwrap();
        let encoding = FeatureEncoder::new(&schema).encode_batch(&table).unwrap();
        assert_eq!(encoding.bins, vec![Some(DurationBin::Standard)]);
        assert_eq!(encoding.matrix.column("Duration_Standard"), Some(vec![1.0]));
    }

    #[test]
    fn test_minutes_column_wins_over_millis() {
        let schema = schema();
        let table = BatchTable::from_csv_str(
            "primaryGenreName,durationMins,trackTimeMillis\nPop,5.0,60000\n",
        )
        .unwrap();
        let encoding = FeatureEncoder::new(&schema).encode_batch(&table).unwrap();
        assert_eq!(encoding.bins, vec![Some(DurationBin::Long)]);
    }

    #[test]
    fn test_derived_minutes_reach_schema_column() {
        let schema = FeatureSchema::new(
            ["const", "durationMins", "Duration_Very Short", "Duration_Standard"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap();
        let encoder = FeatureEncoder::new(&schema);

        let from_millis = BatchTable::from_csv_str(
            "primaryGenreName,trackTimeMillis\nPop,210000\nPop,oops\n",
        )
        .unwrap();
        let from_minutes =
            BatchTable::from_csv_str("primaryGenreName,durationMins\nPop,3.5\nPop,\n").unwrap();

        let a = encoder.encode_batch(&from_millis).unwrap();
        let b = encoder.encode_batch(&from_minutes).unwrap();

        assert_eq!(a.matrix.row(0).unwrap().values(), &[1.0, 3.5, 0.0, 1.0]);
        assert_eq!(a.matrix.row(1).unwrap().values(), &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(a.matrix, b.matrix);
        assert_eq!(a.report.degraded_cells, 1);
        assert_eq!(b.report.degraded_cells, 1);
    }

    #[test]
    fn test_missing_genre_column_aborts() {
        let schema = schema();
        let table = BatchTable::from_csv_str("trackName,durationMins\nA,3.0\n").unwrap();
        let err = FeatureEncoder::new(&schema).encode_batch(&table).unwrap_err();
        match err {
            Error::MissingField(field) => assert_eq!(field, "primaryGenreName"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_duration_source_aborts() {
        let schema = schema();
        let table = BatchTable::from_csv_str("trackName,primaryGenreName\nA,Pop\n").unwrap();
        let err = FeatureEncoder::new(&schema).encode_batch(&table).unwrap_err();
        match err {
            Error::MissingField(field) => {
                assert!(field.contains("durationMins"));
                assert!(field.contains("trackTimeMillis"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_duration_degrades_row_only() {
        let schema = schema();
        let table = BatchTable::from_csv_str(
            "primaryGenreName,durationMins\nPop,abc\nRock,2.5\nPop,\n",
        )
        .unwrap();
        let encoding = FeatureEncoder::new(&schema).encode_batch(&table).unwrap();
        assert_eq!(encoding.bins, vec![None, Some(DurationBin::Short), None]);
        assert_eq!(encoding.matrix.column("Duration_Short"), Some(vec![0.0, 1.0, 0.0]));
        assert_eq!(encoding.matrix.column("Genre_Pop"), Some(vec![1.0, 0.0, 1.0]));
        assert_eq!(encoding.report.degraded_cells, 2);
    }

    #[test]
    fn test_unseen_genre_column_is_dropped() {
        let schema = schema();
        let table = BatchTable::from_csv_str(
            "primaryGenreName,durationMins\nPolka,3.5\nPop,3.5\n",
        )
        .unwrap();
        let encoding = FeatureEncoder::new(&schema).encode_batch(&table).unwrap();
        assert!(encoding.report.dropped.contains(&"Genre_Polka".to_string()));
        assert!(encoding.report.zero_filled.contains(&"Genre_Rock".to_string()));
        let first = encoding.matrix.row(0).unwrap();
        assert_eq!(first.get("Genre_Pop"), Some(0.0));
        assert_eq!(first.get("Genre_Rock"), Some(0.0));
        assert_eq!(first.len(), schema.len());
    }

    #[test]
    fn test_passthrough_numeric_columns() {
        let schema = schema();
        let table = BatchTable::from_csv_str(
            "artistPopularity,primaryGenreName,durationMins,prevTrackPopularity\n80,Rock,7,x\n",
        )
        .unwrap();
        let encoding = FeatureEncoder::new(&schema).encode_batch(&table).unwrap();
        let row = encoding.matrix.row(0).unwrap();
        assert_eq!(row.get("artistPopularity"), Some(80.0));
        assert_eq!(row.get("prevTrackPopularity"), Some(0.0));
        assert_eq!(row.get("Duration_Very Long"), Some(1.0));
        assert_eq!(row.get("const"), Some(1.0));
    }

    #[test]
    fn test_uploaded_dummy_columns_are_not_trusted() {
        let schema = schema();
        let table = BatchTable::from_csv_str(
            "primaryGenreName,durationMins,Genre_Rock\nPop,3.5,1\n",
        )
        .unwrap();
        let encoding = FeatureEncoder::new(&schema).encode_batch(&table).unwrap();
        let row = encoding.matrix.row(0).unwrap();
        assert_eq!(row.get("Genre_Rock"), Some(0.0));
        assert_eq!(row.get("Genre_Pop"), Some(1.0));
    }

    #[test]
    fn test_empty_table_yields_empty_matrix() {
        let schema = schema();
        let table = BatchTable::from_csv_str("primaryGenreName,durationMins\n").unwrap();
        let encoding = FeatureEncoder::new(&schema).encode_batch(&table).unwrap();
        assert_eq!(encoding.matrix.n_rows(), 0);
        assert_eq!(encoding.matrix.n_cols(), schema.len());
    }
}
