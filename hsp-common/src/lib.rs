//! # HSP Common Library
//!
//! Feature encoding and scoring engine shared by the HSP binaries:
//! - Feature schema registry derived from the model artifact
//! - Genre and duration categorical encoding (one-hot, drop-first)
//! - Single-record and batch encoders aligned to the schema
//! - Model artifact loading and popularity prediction
//! - Configuration loading

pub mod batch;
pub mod config;
pub mod duration;
pub mod encoder;
pub mod error;
pub mod features;
pub mod genre;
pub mod model;
pub mod prediction;
pub mod schema;

pub use batch::{BatchColumns, BatchEncoding, BatchTable, ReconciliationReport};
pub use duration::{DurationAdvice, DurationBin};
pub use encoder::{FeatureEncoder, SongInputs};
pub use error::{Error, Result};
pub use features::{CategoricalFlag, EncodedMatrix, EncodedRecord, SparseRecord};
pub use model::{LinearModel, ModelArtifact, PopularityModel};
pub use prediction::{Predictor, ScoredBatch, SinglePrediction, Tier};
pub use schema::{FeatureSchema, SchemaRegistry};
