//! Test fixtures for common backend states
//!
//! Provides reusable record documents and the two-plane golden table

use crate::InMemoryPlane;
use nfv_lcm_common::OperationStatus;
use serde_json::{json, Value};

/// SOL003 VNFM documents
pub mod tacker_fixtures {
    use super::*;

    /// Operation occurrence in the given `operationState`
    pub fn op_occ(id: &str, vnf_instance_id: &str, operation: &str, state: &str) -> Value {
        json!({
            "id": id,
            "vnfInstanceId": vnf_instance_id,
            "operation": operation,
            "operationState": state,
        })
    }

    /// Freshly created VNF instance
    pub fn vnf_not_instantiated(id: &str, vnfd_id: &str) -> Value {
        json!({
            "id": id,
            "vnfdId": vnfd_id,
            "instantiationState": "NOT_INSTANTIATED",
        })
    }

    /// Instantiated VNF instance with one VNFC and one external CP
    pub fn vnf_instantiated(id: &str, vnfd_id: &str, flavour_id: &str) -> Value {
        json!({
            "id": id,
            "vnfdId": vnfd_id,
            "vnfInstanceName": format!("{}-name", id),
            "instantiationState": "INSTANTIATED",
            "instantiatedVnfInfo": {
                "flavourId": flavour_id,
                "vnfState": "STARTED",
                "vnfcResourceInfo": [{
                    "id": format!("{}-vnfc-0", id),
                    "vduId": "VDU1",
                    "computeResource": {
                        "vimConnectionId": "vim-1",
                        "resourceId": format!("{}-server-0", id),
                        "vimLevelResourceType": "OS::Nova::Server"
                    }
                }],
                "extCpInfo": [{
                    "id": format!("{}-cp-0", id),
                    "cpdId": "CP1",
                    "addresses": ["192.0.2.20"],
                    "macAddress": "fa:16:3e:00:00:01"
                }]
            }
        })
    }
}

/// Stack orchestration documents
pub mod openstack_fixtures {
    use super::*;

    /// Stack record in the given `provisioning_status`
    pub fn stack(id: &str, vnfd_id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "vnfd_id": vnfd_id,
            "name": id,
            "provisioning_status": status,
            "flavour_id": "default",
            "servers": [{"id": format!("{}-srv-0", id), "vdu_id": "VDU1"}],
            "ports": [{"id": format!("{}-port-0", id), "cpd_id": "CP1", "fixed_ips": ["203.0.113.4"]}],
        })
    }
}

/// Readiness marker on the configuration plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPlaneState {
    Missing,
    NotReached,
    Reached,
    Failed,
}

impl ConfigPlaneState {
    pub const ALL: [ConfigPlaneState; 4] = [
        ConfigPlaneState::Missing,
        ConfigPlaneState::NotReached,
        ConfigPlaneState::Reached,
        ConfigPlaneState::Failed,
    ];

    fn marker(&self) -> Option<&'static str> {
        match self {
            ConfigPlaneState::Missing => None,
            ConfigPlaneState::NotReached => Some("not-reached"),
            ConfigPlaneState::Reached => Some("reached"),
            ConfigPlaneState::Failed => Some("failed"),
        }
    }
}

/// Deployment state on the runtime plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimePlaneState {
    Missing,
    Active,
    Error,
}

impl RuntimePlaneState {
    pub const ALL: [RuntimePlaneState; 3] = [
        RuntimePlaneState::Missing,
        RuntimePlaneState::Active,
        RuntimePlaneState::Error,
    ];

    fn state(&self) -> Option<&'static str> {
        match self {
            RuntimePlaneState::Missing => None,
            RuntimePlaneState::Active => Some("active"),
            RuntimePlaneState::Error => Some("error"),
        }
    }
}

/// Service-manager documents
pub mod nso_fixtures {
    use super::*;

    /// Collection holding deployments on both planes
    pub const DEPLOYMENTS: &str = "deployments";

    /// Deployment service with an optional plan readiness marker
    pub fn service(name: &str, vnfd: &str, ready: Option<&str>) -> Value {
        let mut doc = json!({
            "name": name,
            "vnfd": vnfd,
            "flavour": "default",
        });
        if let Some(ready) = ready {
            doc["plan"] = json!({ "ready": ready });
        }
        doc
    }

    /// Runtime deployment record in the given state
    pub fn runtime(state: &str) -> Value {
        json!({
            "state": state,
            "vms": [{"id": "vnfc-0", "vdu": "VDU1", "vm-id": "vm-0"}],
            "connection-points": [{"id": "cp-0", "cpd": "CP1", "ip-addresses": ["10.10.0.2"]}],
        })
    }

    /// Puts both planes into the given states for `deployment`.
    pub fn apply(
        config: &InMemoryPlane,
        runtime_plane: &InMemoryPlane,
        deployment: &str,
        config_state: ConfigPlaneState,
        runtime_state: RuntimePlaneState,
    ) {
        config.remove(DEPLOYMENTS, deployment);
        runtime_plane.remove(DEPLOYMENTS, deployment);
        if config_state != ConfigPlaneState::Missing {
            config.set_document(
                DEPLOYMENTS,
                deployment,
                service(deployment, "vnfd-golden", config_state.marker()),
            );
        }
        if let Some(state) = runtime_state.state() {
            runtime_plane.set_document(DEPLOYMENTS, deployment, runtime(state));
        }
    }
}

/// One row of the two-plane reconciliation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoldenCase {
    pub config: ConfigPlaneState,
    pub runtime: RuntimePlaneState,
    pub instantiate: OperationStatus,
    pub terminate: OperationStatus,
}

/// Expected status for every combination of plane states
///
/// Terminate rows assume the target existed when the terminate was issued.
pub fn two_plane_golden_table() -> Vec<GoldenCase> {
    use ConfigPlaneState as A;
    use OperationStatus::{Failed, Pending, Success};
    use RuntimePlaneState as B;

    let row = |config, runtime, instantiate, terminate| GoldenCase {
        config,
        runtime,
        instantiate,
        terminate,
    };

    vec![
        row(A::Missing, B::Missing, Pending, Success),
        row(A::Missing, B::Active, Pending, Pending),
        row(A::Missing, B::Error, Pending, Failed),
        row(A::NotReached, B::Missing, Pending, Pending),
        row(A::NotReached, B::Active, Pending, Pending),
        row(A::NotReached, B::Error, Pending, Failed),
        row(A::Reached, B::Missing, Failed, Pending),
        row(A::Reached, B::Active, Success, Pending),
        row(A::Reached, B::Error, Failed, Failed),
        row(A::Failed, B::Missing, Failed, Pending),
        row(A::Failed, B::Active, Failed, Pending),
        row(A::Failed, B::Error, Failed, Failed),
    ]
}
