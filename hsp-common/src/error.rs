//! Common error types for HSP

use thiserror::Error;

/// Common result type for HSP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across HSP crates
#[derive(Error, Debug)]
pub enum Error {
    /// Model artifact missing, unreadable or malformed (fatal at startup)
    #[error("Model artifact error: {0}")]
    ModelArtifact(String),

    /// A structural batch column is absent from the uploaded table
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
