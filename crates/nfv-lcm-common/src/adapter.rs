//! Vendor adapter capability contract.
//!
//! Every orchestration backend is driven through [`VnfmAdapter`]. Each
//! vendor implements the subset of operations its platform supports; the
//! rest fall through to defaults that return
//! [`LcmError::NotSupported`].
//!
//! Action-initiating operations (`instantiate`, `terminate`, `operate`,
//! `scale`) return an [`OperationHandle`] as soon as the backend has
//! accepted the request. The handle is the only link between the request
//! and later [`get_operation_status`](VnfmAdapter::get_operation_status)
//! calls.
//!
//! # Example
//!
//! ```ignore
//! use nfv_lcm_common::{wait_for_completion, InstantiateRequest, WaitOptions};
//!
//! let handle = adapter.instantiate(&InstantiateRequest::new("vnf-1", "simple")).await?;
//! let outcome = wait_for_completion(adapter.as_ref(), &handle, &WaitOptions::default()).await?;
//! if outcome.timed_out {
//!     // still PENDING after the budget
//! }
//! ```

use crate::error::{LcmError, LcmResult};
use crate::handle::{OperationHandle, Vendor};
use crate::oplog::OperationLog;
use crate::status::OperationStatus;
use async_trait::async_trait;
use nfv_types::{NsInstance, VnfInstance, VnfState};
use serde::{Deserialize, Serialize};

/// Request to create a VNF instance identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub vnfd_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_instance_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnf_instance_description: Option<String>,
}

impl CreateRequest {
    pub fn new(vnfd_id: impl Into<String>) -> Self {
        Self {
            vnfd_id: vnfd_id.into(),
            vnf_instance_name: None,
            vnf_instance_description: None,
        }
    }
}

/// Request to instantiate a VNF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantiateRequest {
    /// Instance (or deployment) to instantiate.
    #[serde(skip)]
    pub vnf_instance_id: String,
    pub flavour_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instantiation_level_id: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub additional_params: serde_json::Value,
}

impl InstantiateRequest {
    pub fn new(vnf_instance_id: impl Into<String>, flavour_id: impl Into<String>) -> Self {
        Self {
            vnf_instance_id: vnf_instance_id.into(),
            flavour_id: flavour_id.into(),
            instantiation_level_id: None,
            additional_params: serde_json::Value::Null,
        }
    }
}

/// How a VNF is shut down on termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationType {
    #[default]
    Forceful,
    Graceful,
}

/// Request to terminate a VNF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateRequest {
    #[serde(skip)]
    pub vnf_instance_id: String,
    pub termination_type: TerminationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graceful_termination_timeout: Option<u64>,
}

impl TerminateRequest {
    pub fn forceful(vnf_instance_id: impl Into<String>) -> Self {
        Self {
            vnf_instance_id: vnf_instance_id.into(),
            termination_type: TerminationType::Forceful,
            graceful_termination_timeout: None,
        }
    }

    pub fn graceful(vnf_instance_id: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            vnf_instance_id: vnf_instance_id.into(),
            termination_type: TerminationType::Graceful,
            graceful_termination_timeout: Some(timeout_secs),
        }
    }
}

/// Scaling direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleDirection {
    #[serde(rename = "SCALE_OUT")]
    Out,
    #[serde(rename = "SCALE_IN")]
    In,
}

/// Request to scale a VNF along one aspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRequest {
    #[serde(skip)]
    pub vnf_instance_id: String,
    #[serde(rename = "type")]
    pub direction: ScaleDirection,
    pub aspect_id: String,
    pub number_of_steps: u32,
}

/// Request to start or stop a VNF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperateRequest {
    #[serde(skip)]
    pub vnf_instance_id: String,
    pub change_state_to: VnfState,
}

/// Capability set of a vendor adapter.
///
/// Action methods take `&mut self` because they append to the adapter's
/// [`OperationLog`]; `query` and `get_operation_status` take `&self` and
/// never modify adapter or backend state.
#[async_trait]
pub trait VnfmAdapter: Send + Sync {
    /// Returns the vendor this adapter drives.
    fn vendor(&self) -> Vendor;

    /// Returns the handles this adapter has issued.
    fn operation_log(&self) -> &OperationLog;

    /// Creates a VNF instance identifier and returns it.
    async fn create_id(&mut self, _request: &CreateRequest) -> LcmResult<String> {
        Err(LcmError::not_supported(self.vendor(), "create_id"))
    }

    /// Starts instantiation.
    async fn instantiate(&mut self, _request: &InstantiateRequest) -> LcmResult<OperationHandle> {
        Err(LcmError::not_supported(self.vendor(), "instantiate"))
    }

    /// Returns the current VNF instance record.
    async fn query(&self, _vnf_instance_id: &str) -> LcmResult<VnfInstance> {
        Err(LcmError::not_supported(self.vendor(), "query"))
    }

    /// Returns the current NS instance record.
    async fn query_ns(&self, _ns_instance_id: &str) -> LcmResult<NsInstance> {
        Err(LcmError::not_supported(self.vendor(), "query_ns"))
    }

    /// Starts termination.
    async fn terminate(&mut self, _request: &TerminateRequest) -> LcmResult<OperationHandle> {
        Err(LcmError::not_supported(self.vendor(), "terminate"))
    }

    /// Starts a start/stop operation.
    async fn operate(&mut self, _request: &OperateRequest) -> LcmResult<OperationHandle> {
        Err(LcmError::not_supported(self.vendor(), "operate"))
    }

    /// Starts a scaling operation.
    async fn scale(&mut self, _request: &ScaleRequest) -> LcmResult<OperationHandle> {
        Err(LcmError::not_supported(self.vendor(), "scale"))
    }

    /// Reconciles backend state into a normalized status.
    ///
    /// Must be deterministic for a given backend state and must not fail
    /// merely because the operation is still running.
    async fn get_operation_status(&self, _handle: &OperationHandle) -> LcmResult<OperationStatus> {
        Err(LcmError::not_supported(self.vendor(), "get_operation_status"))
    }
}
