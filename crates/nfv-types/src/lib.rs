//! Typed record model for NFV lifecycle conformance testing.
//!
//! This crate provides the entities returned by lifecycle query operations
//! and the schema machinery used to validate them:
//!
//! - [`VnfInstance`] / [`NsInstance`]: instance records as reported by a VNFM/NFVO
//! - [`InstantiatedVnfInfo`]: present exactly when a VNF is instantiated
//! - [`VnfcResourceInfo`], [`ResourceHandle`], [`ExtCpInfo`]: per-unit and
//!   per-attachment detail rebuilt on every query
//! - [`RecordSchema`] / [`SchemaRegistry`]: closed, declared attribute sets
//! - [`TypedRecord`] / [`TypedSeq`]: values validated on every assignment
//!   and every sequence mutation

mod instance;
mod record;
mod schema;

pub use instance::{
    ExtCpInfo, InstantiatedNsInfo, InstantiatedVnfInfo, Instantiation, InstantiationState,
    NsInstance, ResourceHandle, VnfInstance, VnfState, VnfcResourceInfo,
};
pub use record::{ToRecord, TypedRecord, TypedSeq, Value};
pub use schema::{names, AttrSpec, AttrType, RecordSchema, RecordSchemaBuilder, SchemaRegistry};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid instantiation state: {0}")]
    InvalidInstantiationState(String),

    #[error("invalid VNF state: {0}")]
    InvalidVnfState(String),

    #[error("instance {id}: instantiation state {state} does not match presence of instantiated info")]
    InstantiationMismatch { id: String, state: String },
}

/// Errors raised by typed record validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{record}: invalid attribute '{attribute}'")]
    InvalidAttribute { record: String, attribute: String },

    #[error("{record}.{attribute}: expected {expected}, got {actual}")]
    TypeMismatch {
        record: String,
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("{record}.{attribute}: '{value}' is not one of {allowed:?}")]
    InvalidEnumValue {
        record: String,
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("{record}: missing required attribute '{attribute}'")]
    MissingAttribute { record: String, attribute: String },

    #[error("{record}.{attribute}: index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        record: String,
        attribute: String,
        index: usize,
        len: usize,
    },

    #[error("unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("duplicate record type: {0}")]
    DuplicateRecordType(String),
}
