//! Error types for lifecycle operations and status reconciliation.
//!
//! All errors implement `std::error::Error` via `thiserror`. A pending
//! operation is never an error: in-progress work is reported as
//! [`OperationStatus::Pending`](crate::OperationStatus::Pending).

use crate::handle::Vendor;
use nfv_types::{ParseError, SchemaError};
use thiserror::Error;

/// Result type alias for lifecycle operations.
pub type LcmResult<T> = Result<T, LcmError>;

/// Failures while resolving or constructing a vendor adapter.
///
/// These are fatal and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterConstructionError {
    /// The identifier does not name a known vendor.
    #[error("unknown vendor '{0}'")]
    UnknownVendor(String),

    /// The vendor is known but no constructor is registered for it.
    #[error("no adapter constructor registered for vendor '{0}'")]
    ConstructorMissing(Vendor),

    /// The constructor rejected its configuration.
    #[error("failed to construct {vendor} adapter: {message}")]
    ConstructionFailed {
        /// The vendor being constructed.
        vendor: Vendor,
        /// Why construction failed.
        message: String,
    },
}

impl AdapterConstructionError {
    /// Creates a construction failure.
    pub fn failed(vendor: Vendor, message: impl Into<String>) -> Self {
        Self::ConstructionFailed {
            vendor,
            message: message.into(),
        }
    }
}

/// Errors surfaced by adapters and the reconciliation engine.
#[derive(Debug, Error)]
pub enum LcmError {
    /// Adapter could not be built.
    #[error(transparent)]
    Construction(#[from] AdapterConstructionError),

    /// The adapter does not implement this capability.
    #[error("{vendor} adapter does not support {operation}")]
    NotSupported {
        /// The adapter's vendor.
        vendor: Vendor,
        /// The unsupported operation.
        operation: &'static str,
    },

    /// Transport-level failure while talking to a control plane.
    #[error("backend communication failed on plane '{plane}' during {operation}: {message}")]
    Backend {
        /// The plane being contacted.
        plane: String,
        /// The operation in progress (e.g., "probe_state").
        operation: String,
        /// Error message.
        message: String,
    },

    /// A raw state token that the vendor table does not know.
    #[error("plane '{plane}' reported unrecognized state token '{token}'")]
    AmbiguousState {
        /// The plane that produced the token.
        plane: String,
        /// The raw token.
        token: String,
    },

    /// The backend is not in a state where the operation makes sense.
    #[error("invalid precondition for {operation} on '{resource}': {message}")]
    InvalidPrecondition {
        /// The lifecycle operation.
        operation: String,
        /// The resource identifier.
        resource: String,
        /// Error message.
        message: String,
    },

    /// A handle issued by a different adapter was passed in.
    #[error("operation handle {handle} was not issued by the {vendor} adapter")]
    InvalidHandle {
        /// The handle's display form.
        handle: String,
        /// The adapter that rejected it.
        vendor: Vendor,
    },

    /// A plane returned a document that does not fit the record model.
    #[error("invalid document from plane '{plane}': {message}")]
    InvalidDocument {
        /// The plane that returned the document.
        plane: String,
        /// Error message.
        message: String,
    },

    /// Typed record validation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl LcmError {
    /// Creates a backend communication error.
    pub fn backend(
        plane: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            plane: plane.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an unrecognized-token error.
    pub fn ambiguous_state(plane: impl Into<String>, token: impl Into<String>) -> Self {
        Self::AmbiguousState {
            plane: plane.into(),
            token: token.into(),
        }
    }

    /// Creates an invalid precondition error.
    pub fn invalid_precondition(
        operation: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPrecondition {
            operation: operation.into(),
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(plane: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            plane: plane.into(),
            message: message.into(),
        }
    }

    /// Creates a not-supported error.
    pub fn not_supported(vendor: Vendor, operation: &'static str) -> Self {
        Self::NotSupported { vendor, operation }
    }

    /// Returns true if this error indicates a transient condition
    /// that may clear on the next poll.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LcmError::Backend { .. })
    }
}

impl From<ParseError> for LcmError {
    fn from(e: ParseError) -> Self {
        LcmError::InvalidDocument {
            plane: "record".to_string(),
            message: e.to_string(),
        }
    }
}
