// src/lib.rs

//! Interpolation and reconciliation of SSP scenario projections into dense,
//! annual, region-aggregated tables.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod growth;
pub mod ingest;
pub mod interpolate;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod table;

pub use config::PipelineConfig;
pub use error::{EngineError, Result};
pub use table::{Record, Table};
