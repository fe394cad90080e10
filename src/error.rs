// src/error.rs

use thiserror::Error;

/// Errors raised by the in-memory engine stages.
///
/// Per-partition conditions (too few points, unmapped labels, unknown regions)
/// are not errors: they are handled where they occur and logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("group key must name at least one field")]
    EmptyGroupKey,

    #[error("`{0}` cannot be used as a grouping field")]
    ReservedField(String),

    #[error("duplicate year {year} in partition [{key}]")]
    DuplicateYear { key: String, year: i32 },

    #[error("unsupported output extension `{0}` (expected .csv or .parquet)")]
    UnsupportedOutput(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
