//! Single-plane OpenStack orchestration adapter.
//!
//! The stack record itself carries the status as `provisioning_status`
//! (`ACTIVE`, `ERROR`, `PENDING_*`). There is no per-operation record, so
//! the handle correlates to the stack and a vanished stack is how a
//! completed terminate shows up.
//!
//! The same status says nothing about whether the VNF is instantiated: a
//! deployed stack keeps its servers and ports through `PENDING_UPDATE` or
//! `ERROR`. Only a stack in its initial create, or one that was never
//! deployed, queries as not instantiated.

use crate::rest::RestPlane;
use async_trait::async_trait;
use nfv_lcm_common::{
    ActionRequest, AdapterConfig, AdapterConstructionError, ControlPlane, Correlation,
    CreateRequest, InstantiateRequest, LcmError, LcmResult, OperationHandle, OperationKind,
    OperationLog, OperationStatus, ScaleRequest, Selector, SinglePlaneProbe, StatusTable,
    TerminateRequest, Vendor, VnfmAdapter,
};
use nfv_types::{
    ExtCpInfo, InstantiatedVnfInfo, ResourceHandle, VnfInstance, VnfState, VnfcResourceInfo,
};
use serde::Deserialize;
use serde_json::json;
use std::net::IpAddr;
use std::sync::Arc;

/// Plane name used in configuration and errors.
pub const ORCHESTRATION_PLANE: &str = "orchestration";

const STACKS: &str = "stacks";
const PROVISIONING_STATUS: &str = "provisioning_status";
const SERVER_RESOURCE_TYPE: &str = "OS::Nova::Server";
const INITIAL_CREATE: &str = "pending_create";
const SERVER_SHUTOFF: &str = "SHUTOFF";

/// `provisioning_status` values.
pub const PROVISIONING_TABLE: StatusTable = StatusTable::new(
    ORCHESTRATION_PLANE,
    &[
        ("active", OperationStatus::Success),
        ("error", OperationStatus::Failed),
    ],
    &[("pending_", OperationStatus::Pending)],
);

#[derive(Debug, Deserialize)]
struct StackDoc {
    id: String,
    vnfd_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    provisioning_status: Option<String>,
    #[serde(default)]
    flavour_id: Option<String>,
    #[serde(default)]
    servers: Vec<ServerDoc>,
    #[serde(default)]
    ports: Vec<PortDoc>,
}

#[derive(Debug, Deserialize)]
struct ServerDoc {
    id: String,
    vdu_id: String,
    /// Compute power state (`ACTIVE`, `SHUTOFF`, ...).
    #[serde(default)]
    status: Option<String>,
}

impl ServerDoc {
    fn is_shut_off(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case(SERVER_SHUTOFF))
    }
}

#[derive(Debug, Deserialize)]
struct PortDoc {
    id: String,
    cpd_id: String,
    #[serde(default)]
    fixed_ips: Vec<IpAddr>,
    #[serde(default)]
    mac_address: Option<String>,
}

/// Adapter for stack-based VIM orchestration.
pub struct OpenStackAdapter {
    plane: Arc<dyn ControlPlane>,
    vim_connection_id: String,
    verify_terminate_target: bool,
    log: OperationLog,
}

impl OpenStackAdapter {
    pub fn new(plane: Arc<dyn ControlPlane>, config: &AdapterConfig) -> Self {
        Self {
            plane,
            vim_connection_id: config.vim_connection_id.clone(),
            verify_terminate_target: config.verify_terminate_target,
            log: OperationLog::new(),
        }
    }

    /// Builds the adapter against the REST endpoint named `orchestration`.
    pub fn from_config(config: &AdapterConfig) -> Result<Self, AdapterConstructionError> {
        let endpoint = config.endpoint(Vendor::OpenStack, ORCHESTRATION_PLANE)?;
        let plane = RestPlane::new(
            Vendor::OpenStack,
            ORCHESTRATION_PLANE,
            endpoint,
            config.request_timeout(),
        )?;
        Ok(Self::new(Arc::new(plane), config))
    }

    fn stack(id: &str) -> Selector {
        Selector::new(STACKS, id, PROVISIONING_STATUS)
    }

    async fn act(
        &mut self,
        kind: OperationKind,
        stack_id: &str,
        action: &str,
        body: serde_json::Value,
    ) -> LcmResult<OperationHandle> {
        self.plane
            .issue_action(&ActionRequest::on(STACKS, stack_id, action, body))
            .await?;
        let handle = OperationHandle::new(
            Vendor::OpenStack,
            kind,
            Correlation::Resource(stack_id.to_string()),
        );
        self.log.record(&handle);
        tracing::info!(handle = %handle, stack_id, action, "Issued stack action");
        Ok(handle)
    }

    fn to_instance(&self, doc: StackDoc) -> LcmResult<VnfInstance> {
        let creating = match doc.provisioning_status.as_deref() {
            Some(raw) => {
                PROVISIONING_TABLE.normalize(raw)?;
                raw.trim().eq_ignore_ascii_case(INITIAL_CREATE)
            }
            None => false,
        };
        let deployed = doc.flavour_id.is_some() || !doc.servers.is_empty();

        let mut vnf = if deployed && !creating {
            let flavour_id = doc.flavour_id.ok_or_else(|| {
                LcmError::invalid_document(
                    ORCHESTRATION_PLANE,
                    format!("deployed stack {} has no flavour_id", doc.id),
                )
            })?;
            let all_shut_off =
                !doc.servers.is_empty() && doc.servers.iter().all(ServerDoc::is_shut_off);
            let vnf_state = if all_shut_off {
                VnfState::Stopped
            } else {
                VnfState::Started
            };
            let vnfc_resource_info = doc
                .servers
                .into_iter()
                .map(|server| VnfcResourceInfo {
                    compute_resource: ResourceHandle {
                        vim_connection_id: self.vim_connection_id.clone(),
                        resource_id: server.id.clone(),
                        vim_level_resource_type: Some(SERVER_RESOURCE_TYPE.to_string()),
                    },
                    id: server.id,
                    vdu_id: server.vdu_id,
                })
                .collect();
            let ext_cp_info = doc
                .ports
                .into_iter()
                .map(|port| ExtCpInfo {
                    id: port.id,
                    cpd_id: port.cpd_id,
                    addresses: port.fixed_ips,
                    mac_address: port.mac_address,
                })
                .collect();
            VnfInstance::instantiated(
                doc.id,
                doc.vnfd_id,
                InstantiatedVnfInfo {
                    flavour_id,
                    vnf_state,
                    vnfc_resource_info,
                    ext_cp_info,
                },
            )
        } else {
            VnfInstance::not_instantiated(doc.id, doc.vnfd_id)
        };
        vnf.vnf_instance_name = doc.name;
        Ok(vnf)
    }
}

#[async_trait]
impl VnfmAdapter for OpenStackAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::OpenStack
    }

    fn operation_log(&self) -> &OperationLog {
        &self.log
    }

    async fn create_id(&mut self, request: &CreateRequest) -> LcmResult<String> {
        let body = json!({
            "name": request.vnf_instance_name,
            "description": request.vnf_instance_description,
            "vnfd_id": request.vnfd_id,
        });
        let id = self
            .plane
            .issue_action(&ActionRequest::create(STACKS, body))
            .await?;
        tracing::info!(stack_id = %id, vnfd_id = %request.vnfd_id, "Created stack");
        Ok(id)
    }

    async fn instantiate(&mut self, request: &InstantiateRequest) -> LcmResult<OperationHandle> {
        let body = json!({
            "flavour_id": request.flavour_id,
            "instantiation_level_id": request.instantiation_level_id,
            "parameters": request.additional_params,
        });
        self.act(OperationKind::Instantiate, &request.vnf_instance_id, "deploy", body)
            .await
    }

    async fn query(&self, vnf_instance_id: &str) -> LcmResult<VnfInstance> {
        let doc = self
            .plane
            .read_document(&Self::stack(vnf_instance_id))
            .await?
            .ok_or_else(|| {
                LcmError::invalid_precondition("query", vnf_instance_id, "stack not found")
            })?;
        let doc: StackDoc = serde_json::from_value(doc)
            .map_err(|e| LcmError::invalid_document(ORCHESTRATION_PLANE, e.to_string()))?;
        self.to_instance(doc)
    }

    async fn terminate(&mut self, request: &TerminateRequest) -> LcmResult<OperationHandle> {
        let stack_id = request.vnf_instance_id.as_str();
        let existed = if self.verify_terminate_target {
            Some(self.plane.read_document(&Self::stack(stack_id)).await?.is_some())
        } else {
            None
        };

        self.plane
            .issue_action(&ActionRequest::on(STACKS, stack_id, "delete", serde_json::Value::Null))
            .await?;
        let handle = OperationHandle::new(
            Vendor::OpenStack,
            OperationKind::Terminate,
            Correlation::Resource(stack_id.to_string()),
        );
        match existed {
            Some(existed) => {
                if !existed {
                    tracing::warn!(handle = %handle, stack_id, "Terminating a stack that does not exist");
                }
                self.log.record_terminate(&handle, existed);
            }
            None => self.log.record(&handle),
        }
        tracing::info!(handle = %handle, stack_id, "Issued stack delete");
        Ok(handle)
    }

    async fn scale(&mut self, request: &ScaleRequest) -> LcmResult<OperationHandle> {
        let body = serde_json::to_value(request)
            .map_err(|e| LcmError::invalid_document(ORCHESTRATION_PLANE, e.to_string()))?;
        self.act(OperationKind::Scale, &request.vnf_instance_id, "scale", body)
            .await
    }

    async fn get_operation_status(&self, handle: &OperationHandle) -> LcmResult<OperationStatus> {
        handle.ensure_vendor(Vendor::OpenStack)?;
        let Correlation::Resource(stack_id) = handle.correlation() else {
            return Err(LcmError::InvalidHandle {
                handle: handle.to_string(),
                vendor: Vendor::OpenStack,
            });
        };

        SinglePlaneProbe::new(self.plane.as_ref(), &PROVISIONING_TABLE)
            .status(
                handle.kind(),
                &Self::stack(stack_id),
                self.log.target_existed(handle),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfv_lcm_common::{OperateRequest, ScaleDirection};
    use nfv_types::InstantiationState;
    use nfv_lcm_test::InMemoryPlane;

    fn setup(config: &AdapterConfig) -> (OpenStackAdapter, Arc<InMemoryPlane>) {
        let plane = Arc::new(InMemoryPlane::new(ORCHESTRATION_PLANE));
        (OpenStackAdapter::new(plane.clone(), config), plane)
    }

    #[tokio::test]
    async fn test_instantiate_lifecycle() {
        let (mut adapter, plane) = setup(&AdapterConfig::default());
        let handle = adapter
            .instantiate(&InstantiateRequest::new("web", "small"))
            .await
            .unwrap();
        assert_eq!(handle.correlation(), &Correlation::Resource("web".to_string()));

        // not materialized yet
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Pending
        );

        plane.set_state(STACKS, "web", PROVISIONING_STATUS, "PENDING_CREATE");
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Pending
        );

        plane.set_state(STACKS, "web", PROVISIONING_STATUS, "ACTIVE");
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Success
        );
    }

    #[tokio::test]
    async fn test_terminate_absence_is_success() {
        let (mut adapter, plane) = setup(&AdapterConfig::default());
        plane.set_state(STACKS, "web", PROVISIONING_STATUS, "ACTIVE");

        let handle = adapter
            .terminate(&TerminateRequest::forceful("web"))
            .await
            .unwrap();
        assert_eq!(adapter.operation_log().target_existed(&handle), Some(true));

        plane.set_state(STACKS, "web", PROVISIONING_STATUS, "PENDING_DELETE");
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Pending
        );

        plane.remove(STACKS, "web");
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Success
        );
    }

    #[tokio::test]
    async fn test_terminate_of_missing_stack() {
        let (mut adapter, _plane) = setup(&AdapterConfig::default());
        let handle = adapter
            .terminate(&TerminateRequest::forceful("ghost"))
            .await
            .unwrap();
        assert!(matches!(
            adapter.get_operation_status(&handle).await,
            Err(LcmError::InvalidPrecondition { .. })
        ));

        // without the existence check, absence is taken at face value
        let config = AdapterConfig {
            verify_terminate_target: false,
            ..AdapterConfig::default()
        };
        let (mut adapter, _plane) = setup(&config);
        let handle = adapter
            .terminate(&TerminateRequest::forceful("ghost"))
            .await
            .unwrap();
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Success
        );
    }

    #[tokio::test]
    async fn test_scale_needs_stack() {
        let (mut adapter, plane) = setup(&AdapterConfig::default());
        let handle = adapter
            .scale(&ScaleRequest {
                vnf_instance_id: "web".to_string(),
                direction: ScaleDirection::Out,
                aspect_id: "worker".to_string(),
                number_of_steps: 1,
            })
            .await
            .unwrap();
        assert!(matches!(
            adapter.get_operation_status(&handle).await,
            Err(LcmError::InvalidPrecondition { .. })
        ));

        plane.set_state(STACKS, "web", PROVISIONING_STATUS, "ERROR");
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_operate_not_supported() {
        let (mut adapter, _plane) = setup(&AdapterConfig::default());
        let err = adapter
            .operate(&OperateRequest {
                vnf_instance_id: "web".to_string(),
                change_state_to: VnfState::Stopped,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LcmError::NotSupported {
                vendor: Vendor::OpenStack,
                operation: "operate"
            }
        ));
    }

    #[tokio::test]
    async fn test_query_builds_instance() {
        let config = AdapterConfig {
            vim_connection_id: "vim-east".to_string(),
            ..AdapterConfig::default()
        };
        let (adapter, plane) = setup(&config);
        plane.set_document(
            STACKS,
            "web",
            json!({
                "id": "web",
                "vnfd_id": "vnfd-web",
                "name": "web-frontend",
                "provisioning_status": "ACTIVE",
                "flavour_id": "small",
                "servers": [{"id": "srv-1", "vdu_id": "VDU1"}, {"id": "srv-2", "vdu_id": "VDU1"}],
                "ports": [{"id": "port-1", "cpd_id": "CP1", "fixed_ips": ["192.0.2.10", "2001:db8::10"]}]
            }),
        );

        let vnf = adapter.query("web").await.unwrap();
        assert_eq!(vnf.vnf_instance_name.as_deref(), Some("web-frontend"));
        let info = vnf.instantiated_info().unwrap();
        assert_eq!(info.vnfc_resource_info.len(), 2);
        assert_eq!(info.vnfc_resource_info[0].compute_resource.vim_connection_id, "vim-east");
        assert_eq!(info.ext_cp_info[0].addresses.len(), 2);

        assert_eq!(info.vnf_state, VnfState::Started);
    }

    #[tokio::test]
    async fn test_query_keeps_info_while_stack_busy_or_failed() {
        let (adapter, plane) = setup(&AdapterConfig::default());
        plane.set_document(
            STACKS,
            "web",
            json!({
                "id": "web",
                "vnfd_id": "vnfd-web",
                "provisioning_status": "ACTIVE",
                "flavour_id": "small",
                "servers": [{"id": "srv-1", "vdu_id": "VDU1"}, {"id": "srv-2", "vdu_id": "VDU1"}]
            }),
        );

        // mid-scale, then after a failed scale
        for status in ["PENDING_UPDATE", "ERROR"] {
            plane.set_state(STACKS, "web", PROVISIONING_STATUS, status);
            let vnf = adapter.query("web").await.unwrap();
            assert_eq!(vnf.instantiation_state(), InstantiationState::Instantiated, "{}", status);
            let info = vnf.instantiated_info().unwrap();
            assert_eq!(info.flavour_id, "small");
            assert_eq!(info.vnfc_resource_info.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_query_not_instantiated_until_deployed() {
        let (adapter, plane) = setup(&AdapterConfig::default());

        // created, never deployed
        plane.set_document(
            STACKS,
            "web",
            json!({"id": "web", "vnfd_id": "vnfd-web", "provisioning_status": "ACTIVE"}),
        );
        let vnf = adapter.query("web").await.unwrap();
        assert_eq!(vnf.instantiation_state(), InstantiationState::NotInstantiated);

        // initial deploy still running
        plane.set_document(
            STACKS,
            "web",
            json!({
                "id": "web",
                "vnfd_id": "vnfd-web",
                "provisioning_status": "PENDING_CREATE",
                "flavour_id": "small",
                "servers": [{"id": "srv-1", "vdu_id": "VDU1"}]
            }),
        );
        let vnf = adapter.query("web").await.unwrap();
        assert_eq!(vnf.instantiation_state(), InstantiationState::NotInstantiated);
    }

    #[tokio::test]
    async fn test_query_stopped_servers() {
        let (adapter, plane) = setup(&AdapterConfig::default());
        plane.set_document(
            STACKS,
            "web",
            json!({
                "id": "web",
                "vnfd_id": "vnfd-web",
                "provisioning_status": "ACTIVE",
                "flavour_id": "small",
                "servers": [
                    {"id": "srv-1", "vdu_id": "VDU1", "status": "SHUTOFF"},
                    {"id": "srv-2", "vdu_id": "VDU1", "status": "SHUTOFF"}
                ]
            }),
        );
        let vnf = adapter.query("web").await.unwrap();
        assert_eq!(vnf.instantiated_info().unwrap().vnf_state, VnfState::Stopped);

        plane.set_document(
            STACKS,
            "web",
            json!({
                "id": "web",
                "vnfd_id": "vnfd-web",
                "flavour_id": "small",
                "servers": [
                    {"id": "srv-1", "vdu_id": "VDU1", "status": "SHUTOFF"},
                    {"id": "srv-2", "vdu_id": "VDU1", "status": "ACTIVE"}
                ]
            }),
        );
        let vnf = adapter.query("web").await.unwrap();
        assert_eq!(vnf.instantiated_info().unwrap().vnf_state, VnfState::Started);
    }

    #[tokio::test]
    async fn test_query_rejects_servers_without_flavour() {
        let (adapter, plane) = setup(&AdapterConfig::default());
        plane.set_document(
            STACKS,
            "web",
            json!({
                "id": "web",
                "vnfd_id": "vnfd-web",
                "provisioning_status": "ACTIVE",
                "servers": [{"id": "srv-1", "vdu_id": "VDU1"}]
            }),
        );
        assert!(matches!(
            adapter.query("web").await,
            Err(LcmError::InvalidDocument { .. })
        ));
    }

    #[tokio::test]
    async fn test_backend_fault_propagates() {
        let (mut adapter, plane) = setup(&AdapterConfig::default());
        let handle = adapter
            .instantiate(&InstantiateRequest::new("web", "small"))
            .await
            .unwrap();
        plane.fail_next(1);
        let err = adapter.get_operation_status(&handle).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Pending
        );
    }
}
