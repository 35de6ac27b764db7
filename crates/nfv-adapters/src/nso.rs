//! Two-plane service manager adapter (Cisco NSO style).
//!
//! The configuration plane holds the deployment service and its plan; the
//! plan's `ready` component is the readiness marker (`reached`,
//! `not-reached`, `failed`). The runtime plane reports where the VMs
//! actually are. The two are operated independently and routinely disagree
//! for a while, which [`TwoPlaneProbe`] resolves.

use crate::rest::RestPlane;
use async_trait::async_trait;
use nfv_lcm_common::{
    ActionRequest, AdapterConfig, AdapterConstructionError, ControlPlane, Correlation,
    CreateRequest, InstantiateRequest, LcmError, LcmResult, OperationHandle, OperationKind,
    OperationLog, OperationStatus, Selector, StatusTable, TerminateRequest, TwoPlaneProbe, Vendor,
    VnfmAdapter,
};
use nfv_types::{
    ExtCpInfo, InstantiatedVnfInfo, ResourceHandle, VnfInstance, VnfState, VnfcResourceInfo,
};
use serde::Deserialize;
use serde_json::json;
use std::net::IpAddr;
use std::sync::Arc;

/// Configuration/orchestration plane name.
pub const CONFIG_PLANE: &str = "config";
/// Runtime/placement plane name.
pub const RUNTIME_PLANE: &str = "runtime";

const DEPLOYMENTS: &str = "deployments";
const READY_MARKER: &str = "plan.ready";
const RUNTIME_STATE: &str = "state";
const VM_RESOURCE_TYPE: &str = "vm";

/// Plan readiness marker values.
pub const PLAN_TABLE: StatusTable = StatusTable::new(
    CONFIG_PLANE,
    &[
        ("reached", OperationStatus::Success),
        ("not-reached", OperationStatus::Pending),
        ("failed", OperationStatus::Failed),
    ],
    &[],
);

/// Runtime deployment states.
pub const RUNTIME_TABLE: StatusTable = StatusTable::new(
    RUNTIME_PLANE,
    &[
        ("active", OperationStatus::Success),
        ("error", OperationStatus::Failed),
        ("failed", OperationStatus::Failed),
        ("deploying", OperationStatus::Pending),
        ("undeploying", OperationStatus::Pending),
        ("recovering", OperationStatus::Pending),
    ],
    &[],
);

#[derive(Debug, Deserialize)]
struct ServiceDoc {
    name: String,
    vnfd: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    flavour: Option<String>,
    #[serde(default)]
    plan: Option<PlanDoc>,
}

#[derive(Debug, Deserialize)]
struct PlanDoc {
    #[serde(default)]
    ready: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RuntimeDoc {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    vms: Vec<VmDoc>,
    #[serde(default)]
    connection_points: Vec<ConnectionPointDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct VmDoc {
    id: String,
    vdu: String,
    vm_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConnectionPointDoc {
    id: String,
    cpd: String,
    #[serde(default)]
    ip_addresses: Vec<IpAddr>,
    #[serde(default)]
    mac_address: Option<String>,
}

/// Adapter for a service manager split over config and runtime planes.
pub struct NsoAdapter {
    config: Arc<dyn ControlPlane>,
    runtime: Arc<dyn ControlPlane>,
    vim_connection_id: String,
    verify_terminate_target: bool,
    log: OperationLog,
}

impl NsoAdapter {
    pub fn new(
        config: Arc<dyn ControlPlane>,
        runtime: Arc<dyn ControlPlane>,
        adapter_config: &AdapterConfig,
    ) -> Self {
        Self {
            config,
            runtime,
            vim_connection_id: adapter_config.vim_connection_id.clone(),
            verify_terminate_target: adapter_config.verify_terminate_target,
            log: OperationLog::new(),
        }
    }

    /// Builds the adapter against the REST endpoints named `config` and
    /// `runtime`.
    pub fn from_config(config: &AdapterConfig) -> Result<Self, AdapterConstructionError> {
        let timeout = config.request_timeout();
        let config_plane = RestPlane::new(
            Vendor::Nso,
            CONFIG_PLANE,
            config.endpoint(Vendor::Nso, CONFIG_PLANE)?,
            timeout,
        )?;
        let runtime_plane = RestPlane::new(
            Vendor::Nso,
            RUNTIME_PLANE,
            config.endpoint(Vendor::Nso, RUNTIME_PLANE)?,
            timeout,
        )?;
        Ok(Self::new(Arc::new(config_plane), Arc::new(runtime_plane), config))
    }

    fn service(deployment: &str) -> Selector {
        Selector::new(DEPLOYMENTS, deployment, READY_MARKER)
    }

    fn placement(deployment: &str) -> Selector {
        Selector::new(DEPLOYMENTS, deployment, RUNTIME_STATE)
    }

    fn probe(&self) -> TwoPlaneProbe<'_> {
        TwoPlaneProbe::new(
            self.config.as_ref(),
            &PLAN_TABLE,
            self.runtime.as_ref(),
            &RUNTIME_TABLE,
        )
    }

    fn deployment_of(handle: &OperationHandle) -> LcmResult<&str> {
        match handle.correlation() {
            Correlation::Resource(deployment) => Ok(deployment),
            Correlation::Occurrence(_) => Err(LcmError::InvalidHandle {
                handle: handle.to_string(),
                vendor: Vendor::Nso,
            }),
        }
    }

    fn build_instance(&self, service: ServiceDoc, runtime: Option<RuntimeDoc>) -> LcmResult<VnfInstance> {
        let ready = match service.plan.and_then(|plan| plan.ready) {
            Some(raw) => PLAN_TABLE.normalize(&raw)? == OperationStatus::Success,
            None => false,
        };
        let runtime = match runtime {
            Some(doc) => {
                let active = match doc.state.as_deref() {
                    Some(raw) => RUNTIME_TABLE.normalize(raw)? == OperationStatus::Success,
                    None => false,
                };
                active.then_some(doc)
            }
            None => None,
        };

        let mut vnf = match (ready, runtime, service.flavour) {
            (true, Some(runtime), Some(flavour_id)) => {
                let vnfc_resource_info = runtime
                    .vms
                    .into_iter()
                    .map(|vm| VnfcResourceInfo {
                        id: vm.id,
                        vdu_id: vm.vdu,
                        compute_resource: ResourceHandle {
                            vim_connection_id: self.vim_connection_id.clone(),
                            resource_id: vm.vm_id,
                            vim_level_resource_type: Some(VM_RESOURCE_TYPE.to_string()),
                        },
                    })
                    .collect();
                let ext_cp_info = runtime
                    .connection_points
                    .into_iter()
                    .map(|cp| ExtCpInfo {
                        id: cp.id,
                        cpd_id: cp.cpd,
                        addresses: cp.ip_addresses,
                        mac_address: cp.mac_address,
                    })
                    .collect();
                VnfInstance::instantiated(
                    service.name,
                    service.vnfd,
                    InstantiatedVnfInfo {
                        flavour_id,
                        vnf_state: VnfState::Started,
                        vnfc_resource_info,
                        ext_cp_info,
                    },
                )
            }
            (true, Some(_), None) => {
                return Err(LcmError::invalid_document(
                    CONFIG_PLANE,
                    format!("deployment {} is ready but has no flavour", service.name),
                ))
            }
            _ => VnfInstance::not_instantiated(service.name, service.vnfd),
        };
        vnf.vnf_instance_name = service.description;
        Ok(vnf)
    }
}

#[async_trait]
impl VnfmAdapter for NsoAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Nso
    }

    fn operation_log(&self) -> &OperationLog {
        &self.log
    }

    async fn create_id(&mut self, request: &CreateRequest) -> LcmResult<String> {
        let body = json!({
            "name": request.vnf_instance_name,
            "vnfd": request.vnfd_id,
            "description": request.vnf_instance_description,
        });
        let id = self
            .config
            .issue_action(&ActionRequest::create(DEPLOYMENTS, body))
            .await?;
        tracing::info!(deployment = %id, vnfd_id = %request.vnfd_id, "Created deployment service");
        Ok(id)
    }

    async fn instantiate(&mut self, request: &InstantiateRequest) -> LcmResult<OperationHandle> {
        let deployment = request.vnf_instance_id.as_str();
        let body = json!({
            "flavour": request.flavour_id,
            "instantiation-level": request.instantiation_level_id,
            "parameters": request.additional_params,
        });
        self.config
            .issue_action(&ActionRequest::on(DEPLOYMENTS, deployment, "deploy", body))
            .await?;

        let handle = OperationHandle::new(
            Vendor::Nso,
            OperationKind::Instantiate,
            Correlation::Resource(deployment.to_string()),
        );
        self.log.record(&handle);
        tracing::info!(handle = %handle, deployment, "Committed deployment");
        Ok(handle)
    }

    async fn query(&self, vnf_instance_id: &str) -> LcmResult<VnfInstance> {
        let service = self
            .config
            .read_document(&Self::service(vnf_instance_id))
            .await?
            .ok_or_else(|| {
                LcmError::invalid_precondition("query", vnf_instance_id, "deployment not found")
            })?;
        let service: ServiceDoc = serde_json::from_value(service)
            .map_err(|e| LcmError::invalid_document(CONFIG_PLANE, e.to_string()))?;

        let runtime = match self
            .runtime
            .read_document(&Self::placement(vnf_instance_id))
            .await?
        {
            Some(doc) => Some(
                serde_json::from_value::<RuntimeDoc>(doc)
                    .map_err(|e| LcmError::invalid_document(RUNTIME_PLANE, e.to_string()))?,
            ),
            None => None,
        };

        self.build_instance(service, runtime)
    }

    async fn terminate(&mut self, request: &TerminateRequest) -> LcmResult<OperationHandle> {
        let deployment = request.vnf_instance_id.as_str();
        let existed = if self.verify_terminate_target {
            let in_config = self
                .config
                .read_document(&Self::service(deployment))
                .await?
                .is_some();
            let in_runtime = self
                .runtime
                .read_document(&Self::placement(deployment))
                .await?
                .is_some();
            Some(in_config || in_runtime)
        } else {
            None
        };

        self.config
            .issue_action(&ActionRequest::on(
                DEPLOYMENTS,
                deployment,
                "delete",
                serde_json::Value::Null,
            ))
            .await?;

        let handle = OperationHandle::new(
            Vendor::Nso,
            OperationKind::Terminate,
            Correlation::Resource(deployment.to_string()),
        );
        match existed {
            Some(existed) => self.log.record_terminate(&handle, existed),
            None => self.log.record(&handle),
        }
        tracing::info!(handle = %handle, deployment, existed = ?existed, "Deleted deployment service");
        Ok(handle)
    }

    async fn get_operation_status(&self, handle: &OperationHandle) -> LcmResult<OperationStatus> {
        handle.ensure_vendor(Vendor::Nso)?;
        let deployment = Self::deployment_of(handle)?;
        let (service, placement) = (Self::service(deployment), Self::placement(deployment));

        let status = match handle.kind() {
            OperationKind::Instantiate => self.probe().instantiate_status(&service, &placement).await?,
            OperationKind::Terminate => {
                self.probe()
                    .terminate_status(&service, &placement, self.log.target_existed(handle))
                    .await?
            }
            _ => {
                return Err(LcmError::InvalidHandle {
                    handle: handle.to_string(),
                    vendor: Vendor::Nso,
                })
            }
        };
        tracing::debug!(handle = %handle, status = %status, "Reconciled deployment status");
        Ok(status)
    }
}
