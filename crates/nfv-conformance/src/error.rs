//! Error types for the conformance harness

use nfv_lcm_common::{AdapterConstructionError, LcmError};
use nfv_types::SchemaError;
use thiserror::Error;

/// Harness errors
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Adapter could not be built for the requested vendor
    #[error(transparent)]
    Construction(#[from] AdapterConstructionError),

    /// Lifecycle operation error surfaced by an adapter
    #[error(transparent)]
    Lcm(#[from] LcmError),

    /// Query result did not fit the record schema
    #[error("Record validation error: {0}")]
    Schema(#[from] SchemaError),

    /// Traffic worker error
    #[error("Traffic error: {0}")]
    Traffic(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
