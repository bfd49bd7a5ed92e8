//! Error types for permitclean-core

use thiserror::Error;

/// Result type alias for permitclean-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in permitclean-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A column referenced by configuration is absent from the table
    #[error("column '{column}' not found ({context})")]
    ColumnNotFound {
        /// Name of the missing column
        column: String,
        /// Stage or directive that referenced it
        context: String,
    },

    /// A derivation directive cannot be applied
    #[error("directive #{index} ('{new_column}'): {message}")]
    InvalidDirective {
        /// Zero-based position in the directive table
        index: usize,
        /// Column the directive would have created
        new_column: String,
        /// Description of the error
        message: String,
    },

    /// Reference table contains the same join key more than once
    #[error("reference table has duplicate key '{key}'")]
    MergeKeyCollision {
        /// The duplicated (zero-padded) key
        key: String,
    },

    /// A value in a strict date column could not be parsed
    #[error("cannot parse '{value}' in column '{column}' (row {row}) as a date-time")]
    DateParse {
        /// Column being normalized
        column: String,
        /// Zero-based row index
        row: usize,
        /// The offending value
        value: String,
    },

    /// Schema document is not a usable JSON Schema
    #[error("invalid schema {path}: {message}")]
    SchemaInvalid {
        /// Schema location
        path: String,
        /// Compiler message
        message: String,
    },

    /// Input failed schema validation under `fail` severity
    #[error("table does not match the {vendor} schema ({count} error(s)): {first}")]
    SchemaMismatch {
        /// Vendor whose schema was used
        vendor: String,
        /// Number of validation errors
        count: usize,
        /// First reported error
        first: String,
    },

    /// Input bytes are not valid in the configured encoding
    #[error("input is not valid {encoding} ({count} malformed sequence(s))")]
    Decode {
        /// Encoding the bytes were decoded as
        encoding: String,
        /// Number of malformed byte sequences
        count: usize,
    },

    /// Data frame operation failed
    #[error("data frame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn column_not_found(column: &str, context: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.to_string(),
            context: context.into(),
        }
    }
}
