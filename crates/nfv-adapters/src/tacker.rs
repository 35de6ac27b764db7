//! ETSI SOL003 VNFM adapter (OpenStack Tacker).
//!
//! Every lifecycle action creates an operation occurrence record
//! (`vnf_lcm_op_occs/{id}`) whose `operationState` is the status token, so
//! status reconciliation is a single probe against a persistent record.

use crate::rest::RestPlane;
use async_trait::async_trait;
use nfv_lcm_common::{
    ActionRequest, AdapterConfig, AdapterConstructionError, ControlPlane, Correlation,
    CreateRequest, InstantiateRequest, LcmError, LcmResult, OperateRequest, OperationHandle,
    OperationKind, OperationLog, OperationStatus, ScaleRequest, Selector, StatusTable,
    TerminateRequest, Vendor, VnfmAdapter,
};
use nfv_types::{NsInstance, VnfInstance};
use serde::Serialize;
use std::sync::Arc;

/// Plane name used in configuration and errors.
pub const VNFLCM_PLANE: &str = "vnflcm";

const VNF_INSTANCES: &str = "vnf_instances";
const NS_INSTANCES: &str = "ns_instances";
const OP_OCCS: &str = "vnf_lcm_op_occs";
const OPERATION_STATE: &str = "operationState";

/// SOL003 `LcmOperationStateType` values.
pub const OPERATION_STATE_TABLE: StatusTable = StatusTable::new(
    VNFLCM_PLANE,
    &[
        ("completed", OperationStatus::Success),
        ("failed", OperationStatus::Failed),
        ("failed_temp", OperationStatus::Failed),
        ("rolled_back", OperationStatus::Failed),
        ("starting", OperationStatus::Pending),
        ("processing", OperationStatus::Pending),
        ("rolling_back", OperationStatus::Pending),
    ],
    &[],
);

/// Adapter for a SOL003 VNFM.
pub struct TackerAdapter {
    plane: Arc<dyn ControlPlane>,
    log: OperationLog,
}

impl TackerAdapter {
    pub fn new(plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            plane,
            log: OperationLog::new(),
        }
    }

    /// Builds the adapter against the REST endpoint named `vnflcm`.
    pub fn from_config(config: &AdapterConfig) -> Result<Self, AdapterConstructionError> {
        let endpoint = config.endpoint(Vendor::Tacker, VNFLCM_PLANE)?;
        let plane = RestPlane::new(Vendor::Tacker, VNFLCM_PLANE, endpoint, config.request_timeout())?;
        Ok(Self::new(Arc::new(plane)))
    }

    async fn start_occurrence<B: Serialize + Sync>(
        &mut self,
        kind: OperationKind,
        vnf_instance_id: &str,
        body: &B,
    ) -> LcmResult<OperationHandle> {
        let body = serde_json::to_value(body)
            .map_err(|e| LcmError::invalid_document(VNFLCM_PLANE, e.to_string()))?;
        let request = ActionRequest::on(VNF_INSTANCES, vnf_instance_id, kind.as_str(), body);
        let occurrence = self.plane.issue_action(&request).await?;

        let handle = OperationHandle::new(Vendor::Tacker, kind, Correlation::Occurrence(occurrence));
        self.log.record(&handle);
        tracing::info!(handle = %handle, vnf_instance_id, "Started lifecycle operation");
        Ok(handle)
    }
}

#[async_trait]
impl VnfmAdapter for TackerAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Tacker
    }

    fn operation_log(&self) -> &OperationLog {
        &self.log
    }

    async fn create_id(&mut self, request: &CreateRequest) -> LcmResult<String> {
        let body = serde_json::to_value(request)
            .map_err(|e| LcmError::invalid_document(VNFLCM_PLANE, e.to_string()))?;
        let id = self
            .plane
            .issue_action(&ActionRequest::create(VNF_INSTANCES, body))
            .await?;
        tracing::info!(vnf_instance_id = %id, vnfd_id = %request.vnfd_id, "Created VNF instance id");
        Ok(id)
    }

    async fn instantiate(&mut self, request: &InstantiateRequest) -> LcmResult<OperationHandle> {
        self.start_occurrence(OperationKind::Instantiate, &request.vnf_instance_id, request)
            .await
    }

    async fn query(&self, vnf_instance_id: &str) -> LcmResult<VnfInstance> {
        let selector = Selector::new(VNF_INSTANCES, vnf_instance_id, "id");
        let doc = self.plane.read_document(&selector).await?.ok_or_else(|| {
            LcmError::invalid_precondition("query", vnf_instance_id, "VNF instance not found")
        })?;
        serde_json::from_value(doc).map_err(|e| LcmError::invalid_document(VNFLCM_PLANE, e.to_string()))
    }

    async fn query_ns(&self, ns_instance_id: &str) -> LcmResult<NsInstance> {
        let selector = Selector::new(NS_INSTANCES, ns_instance_id, "id");
        let doc = self.plane.read_document(&selector).await?.ok_or_else(|| {
            LcmError::invalid_precondition("query_ns", ns_instance_id, "NS instance not found")
        })?;
        serde_json::from_value(doc).map_err(|e| LcmError::invalid_document(VNFLCM_PLANE, e.to_string()))
    }

    async fn terminate(&mut self, request: &TerminateRequest) -> LcmResult<OperationHandle> {
        self.start_occurrence(OperationKind::Terminate, &request.vnf_instance_id, request)
            .await
    }

    async fn operate(&mut self, request: &OperateRequest) -> LcmResult<OperationHandle> {
        self.start_occurrence(OperationKind::Operate, &request.vnf_instance_id, request)
            .await
    }

    async fn scale(&mut self, request: &ScaleRequest) -> LcmResult<OperationHandle> {
        self.start_occurrence(OperationKind::Scale, &request.vnf_instance_id, request)
            .await
    }

    async fn get_operation_status(&self, handle: &OperationHandle) -> LcmResult<OperationStatus> {
        handle.ensure_vendor(Vendor::Tacker)?;
        let Correlation::Occurrence(occurrence) = handle.correlation() else {
            return Err(LcmError::InvalidHandle {
                handle: handle.to_string(),
                vendor: Vendor::Tacker,
            });
        };

        let selector = Selector::new(OP_OCCS, occurrence, OPERATION_STATE);
        match self.plane.probe_state(&selector).await? {
            Some(raw) if !raw.is_empty() => OPERATION_STATE_TABLE.normalize(&raw),
            // The occurrence is created asynchronously after the 202; until
            // it shows up (with a state) the operation has not started.
            _ => Ok(OperationStatus::Pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfv_lcm_test::InMemoryPlane;
    use nfv_types::InstantiationState;
    use serde_json::json;

    fn setup() -> (TackerAdapter, Arc<InMemoryPlane>) {
        let plane = Arc::new(InMemoryPlane::new(VNFLCM_PLANE));
        (TackerAdapter::new(plane.clone()), plane)
    }

    #[tokio::test]
    async fn test_instantiate_tracks_occurrence() {
        let (mut adapter, plane) = setup();
        let handle = adapter
            .instantiate(&InstantiateRequest::new("vnf-1", "simple"))
            .await
            .unwrap();

        assert_eq!(handle.kind(), OperationKind::Instantiate);
        assert!(adapter.operation_log().get(&handle).is_some());
        let issued = plane.issued_actions();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].action, "instantiate");
        assert_eq!(issued[0].body, json!({"flavourId": "simple"}));

        let occurrence = handle.correlation().id().to_string();
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Pending
        );

        // recorded, but no state yet
        plane.set_document(OP_OCCS, &occurrence, json!({"id": occurrence}));
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Pending
        );

        plane.set_document(OP_OCCS, &occurrence, json!({"operationState": "PROCESSING"}));
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Pending
        );

        plane.set_state(OP_OCCS, &occurrence, OPERATION_STATE, "COMPLETED");
        assert_eq!(
            adapter.get_operation_status(&handle).await.unwrap(),
            OperationStatus::Success
        );
    }

    #[tokio::test]
    async fn test_failure_tokens() {
        let (mut adapter, plane) = setup();
        let handle = adapter
            .terminate(&TerminateRequest::forceful("vnf-1"))
            .await
            .unwrap();
        let occurrence = handle.correlation().id().to_string();

        for token in ["FAILED", "FAILED_TEMP", "ROLLED_BACK"] {
            plane.set_state(OP_OCCS, &occurrence, OPERATION_STATE, token);
            assert_eq!(
                adapter.get_operation_status(&handle).await.unwrap(),
                OperationStatus::Failed
            );
        }

        plane.set_state(OP_OCCS, &occurrence, OPERATION_STATE, "PAUSED");
        assert!(matches!(
            adapter.get_operation_status(&handle).await,
            Err(LcmError::AmbiguousState { .. })
        ));
    }

    #[tokio::test]
    async fn test_foreign_handle_rejected() {
        let (adapter, _plane) = setup();
        let foreign = OperationHandle::new(
            Vendor::Nso,
            OperationKind::Instantiate,
            Correlation::Resource("dep".to_string()),
        );
        assert!(matches!(
            adapter.get_operation_status(&foreign).await,
            Err(LcmError::InvalidHandle { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_and_query() {
        let (mut adapter, plane) = setup();
        let id = adapter
            .create_id(&CreateRequest::new("vnfd-fw"))
            .await
            .unwrap();

        plane.set_document(
            VNF_INSTANCES,
            &id,
            json!({
                "id": id,
                "vnfdId": "vnfd-fw",
                "instantiationState": "INSTANTIATED",
                "instantiatedVnfInfo": {
                    "flavourId": "simple",
                    "vnfState": "STARTED",
                    "vnfcResourceInfo": [{
                        "id": "vnfc-1",
                        "vduId": "VDU1",
                        "computeResource": {"vimConnectionId": "vim-1", "resourceId": "srv-1"}
                    }],
                    "extCpInfo": [{"id": "cp-1", "cpdId": "CP1", "addresses": ["10.0.0.5"]}]
                }
            }),
        );

        let vnf = adapter.query(&id).await.unwrap();
        assert_eq!(vnf.instantiation_state(), InstantiationState::Instantiated);
        let info = vnf.instantiated_info().unwrap();
        assert_eq!(info.vnfc_resource_info[0].compute_resource.resource_id, "srv-1");

        assert!(matches!(
            adapter.query("missing").await,
            Err(LcmError::InvalidPrecondition { .. })
        ));
    }

    #[tokio::test]
    async fn test_query_rejects_inconsistent_record() {
        let (adapter, plane) = setup();
        plane.set_document(
            VNF_INSTANCES,
            "vnf-1",
            json!({"id": "vnf-1", "vnfdId": "d", "instantiationState": "INSTANTIATED"}),
        );
        assert!(matches!(
            adapter.query("vnf-1").await,
            Err(LcmError::InvalidDocument { .. })
        ));
    }

    #[tokio::test]
    async fn test_query_ns() {
        let (adapter, plane) = setup();
        plane.set_document(
            NS_INSTANCES,
            "ns-1",
            json!({
                "id": "ns-1",
                "nsdId": "nsd-1",
                "nsState": "INSTANTIATED",
                "flavourId": "default",
                "vnfInstance": [
                    {"id": "vnf-1", "vnfdId": "d", "instantiationState": "NOT_INSTANTIATED"}
                ]
            }),
        );
        let ns = adapter.query_ns("ns-1").await.unwrap();
        assert_eq!(ns.vnf_instances().len(), 1);
    }
}
