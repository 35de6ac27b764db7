//! Lifecycle-operation status reconciliation core.
//!
//! This crate provides the contract shared by every vendor adapter in the
//! conformance harness:
//!
//! - [`VnfmAdapter`]: capability set {create_id, instantiate, query,
//!   terminate, operate, scale, get_operation_status}
//! - [`ControlPlane`]: the probe/action capability a backend
//!   plane exposes, addressed by [`Selector`]
//! - [`OperationHandle`]: opaque correlation token for an issued action
//! - [`OperationStatus`]: the normalized `SUCCESS | FAILED | PENDING` token
//! - [`StatusTable`]: static per-vendor mapping of raw backend tokens
//! - [`SinglePlaneProbe`] / [`TwoPlaneProbe`]: probe sequencing for one- and
//!   two-plane backends
//! - [`AdapterRegistry`]: vendor → constructor resolution
//! - [`wait_for_completion`]: timeout-bounded polling over an adapter
//!
//! # Architecture
//!
//! 1. A caller issues an action through an adapter and receives a handle
//! 2. The caller (or [`wait_for_completion`]) passes the handle back to
//!    [`VnfmAdapter::get_operation_status`]
//! 3. The adapter probes one or more control planes in a fixed order
//! 4. Raw tokens are normalized through the vendor's [`StatusTable`]
//! 5. Polling stops on a final status or when the time budget runs out

pub mod adapter;
pub mod error;
mod handle;
mod oplog;
mod plane;
mod reconcile;
mod registry;
mod status;
mod wait;

pub use adapter::{
    CreateRequest, InstantiateRequest, OperateRequest, ScaleDirection, ScaleRequest,
    TerminateRequest, TerminationType, VnfmAdapter,
};
pub use error::{AdapterConstructionError, LcmError, LcmResult};
pub use handle::{Correlation, OperationHandle, OperationKind, Vendor};
pub use oplog::{OperationLog, OperationRecord};
pub use plane::{extract_token, state_of, ActionRequest, ControlPlane, Selector};
pub use reconcile::{SinglePlaneProbe, TwoPlaneProbe};
pub use registry::{AdapterConfig, AdapterFactory, AdapterRegistry};
pub use status::{OperationStatus, StatusTable, FINAL_STATES};
pub use wait::{wait_for_completion, WaitOptions, WaitOutcome};
