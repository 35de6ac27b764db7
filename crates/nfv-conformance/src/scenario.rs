//! Lifecycle scenario runner.
//!
//! Drives one VNF through create → instantiate → query → traffic →
//! terminate, waiting for each lifecycle operation to settle, and collects
//! a per-step report.
//!
//! A step that fails is recorded and the run moves on to clean up: once an
//! instance id exists the runner always attempts a terminate.

use crate::config::ScenarioConfig;
use crate::context::LcmContext;
use crate::error::{HarnessError, Result};
use crate::traffic::{TrafficGenerator, TrafficWorker};
use chrono::{DateTime, Utc};
use nfv_lcm_common::{
    wait_for_completion, CreateRequest, InstantiateRequest, LcmResult, OperationHandle,
    OperationRecord, TerminateRequest, Vendor, VnfmAdapter, WaitOutcome,
};
use nfv_types::ToRecord;
use serde::Serialize;
use std::sync::Arc;

/// Scenario step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CreateId,
    Instantiate,
    Query,
    Traffic,
    Terminate,
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub passed: bool,
    /// Wait outcome for lifecycle operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StepReport {
    fn passed(step: Step, detail: impl Into<String>) -> Self {
        Self {
            step,
            passed: true,
            wait: None,
            detail: Some(detail.into()),
        }
    }

    fn failed(step: Step, detail: impl Into<String>) -> Self {
        Self {
            step,
            passed: false,
            wait: None,
            detail: Some(detail.into()),
        }
    }

    fn waited(step: Step, outcome: WaitOutcome) -> Self {
        Self {
            step,
            passed: outcome.succeeded(),
            wait: Some(outcome),
            detail: None,
        }
    }
}

/// Report for a whole run, printed as JSON by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub vendor: Vendor,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vnf_instance_id: Option<String>,
    pub steps: Vec<StepReport>,
    /// Handles the adapter issued during the run, oldest first.
    pub operations: Vec<OperationRecord>,
}

impl ScenarioReport {
    /// True if every step that ran passed.
    pub fn passed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.passed)
    }

    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }
}

/// Runs lifecycle scenarios against adapters built from a context.
pub struct ScenarioRunner<'a> {
    context: &'a LcmContext,
    traffic: Option<Arc<dyn TrafficGenerator>>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(context: &'a LcmContext) -> Self {
        Self {
            context,
            traffic: None,
        }
    }

    /// Adds a traffic step after instantiation.
    pub fn with_traffic(mut self, generator: Arc<dyn TrafficGenerator>) -> Self {
        self.traffic = Some(generator);
        self
    }

    /// Runs the scenario for `vendor`.
    ///
    /// Only setup problems (unknown vendor, adapter construction, missing
    /// scenario inputs) are returned as errors; everything after the adapter
    /// exists ends up in the report.
    pub async fn run(&self, vendor: &str, scenario: &ScenarioConfig) -> Result<ScenarioReport> {
        let mut adapter = self.context.adapter(vendor)?;
        let mut report = ScenarioReport {
            vendor: adapter.vendor(),
            started_at: Utc::now(),
            vnf_instance_id: None,
            steps: Vec::new(),
            operations: Vec::new(),
        };

        let vnf_instance_id = match &scenario.vnf_instance_id {
            Some(id) => id.clone(),
            None => {
                let vnfd_id = scenario.vnfd_id.as_deref().ok_or_else(|| {
                    HarnessError::Configuration(
                        "scenario needs either vnf_instance_id or vnfd_id".to_string(),
                    )
                })?;
                let request = CreateRequest {
                    vnfd_id: vnfd_id.to_string(),
                    vnf_instance_name: scenario.vnf_instance_name.clone(),
                    vnf_instance_description: None,
                };
                match adapter.create_id(&request).await {
                    Ok(id) => {
                        report.steps.push(StepReport::passed(Step::CreateId, id.clone()));
                        id
                    }
                    Err(e) => {
                        report.steps.push(StepReport::failed(Step::CreateId, e.to_string()));
                        return Ok(report);
                    }
                }
            }
        };
        report.vnf_instance_id = Some(vnf_instance_id.clone());
        tracing::info!(vendor = %report.vendor, vnf_instance_id = %vnf_instance_id, "Starting lifecycle scenario");

        let instantiate = InstantiateRequest::new(vnf_instance_id.as_str(), scenario.flavour_id.as_str());
        let issued = adapter.instantiate(&instantiate).await;
        let instantiated = self.settle(adapter.as_ref(), Step::Instantiate, issued, &mut report).await;

        if instantiated {
            report.steps.push(self.check_query(adapter.as_ref(), &vnf_instance_id).await);
            if let Some(generator) = &self.traffic {
                report.steps.push(self.check_traffic(generator.clone()).await);
            }
        }

        let terminate = match scenario.graceful_termination_secs {
            Some(secs) => TerminateRequest::graceful(vnf_instance_id.as_str(), secs),
            None => TerminateRequest::forceful(vnf_instance_id.as_str()),
        };
        let issued = adapter.terminate(&terminate).await;
        self.settle(adapter.as_ref(), Step::Terminate, issued, &mut report).await;

        report.operations = adapter
            .operation_log()
            .records()
            .into_iter()
            .cloned()
            .collect();
        tracing::info!(
            vendor = %report.vendor,
            vnf_instance_id = %vnf_instance_id,
            passed = report.passed(),
            "Lifecycle scenario finished"
        );
        Ok(report)
    }

    /// Waits for an issued operation and records the step. Returns true if
    /// it succeeded.
    async fn settle(
        &self,
        adapter: &dyn VnfmAdapter,
        step: Step,
        issued: LcmResult<OperationHandle>,
        report: &mut ScenarioReport,
    ) -> bool {
        let handle = match issued {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(?step, error = %e, "Lifecycle operation rejected");
                report.steps.push(StepReport::failed(step, e.to_string()));
                return false;
            }
        };

        let options = self.context.config().wait_options();
        let entry = match wait_for_completion(adapter, &handle, &options).await {
            Ok(outcome) => {
                if outcome.timed_out {
                    tracing::warn!(?step, handle = %handle, "Lifecycle operation timed out");
                }
                StepReport::waited(step, outcome)
            }
            Err(e) => {
                tracing::error!(?step, handle = %handle, error = %e, "Status reconciliation failed");
                StepReport::failed(step, e.to_string())
            }
        };
        let passed = entry.passed;
        report.steps.push(entry);
        passed
    }

    async fn check_query(&self, adapter: &dyn VnfmAdapter, vnf_instance_id: &str) -> StepReport {
        let vnf = match adapter.query(vnf_instance_id).await {
            Ok(vnf) => vnf,
            Err(e) => return StepReport::failed(Step::Query, e.to_string()),
        };
        if !vnf.is_instantiated() {
            return StepReport::failed(
                Step::Query,
                format!("instantiation state is {}", vnf.instantiation_state()),
            );
        }

        let checked = vnf
            .to_record(self.context.schemas())
            .and_then(|record| record.validate_complete().map(|_| record));
        match checked {
            Ok(record) => StepReport::passed(
                Step::Query,
                serde_json::to_string(&record).unwrap_or_else(|_| vnf.id.clone()),
            ),
            Err(e) => StepReport::failed(Step::Query, HarnessError::from(e).to_string()),
        }
    }

    async fn check_traffic(&self, generator: Arc<dyn TrafficGenerator>) -> StepReport {
        let config = &self.context.config().traffic;
        let mut worker = TrafficWorker::spawn(generator, config);
        // The worker enforces the budget itself; this only bounds the wait.
        worker.wait_achieved(config.budget()).await;
        worker.cancel();
        match worker.join().await {
            Ok(outcome) if outcome.achieved() => StepReport::passed(Step::Traffic, format!("{:?}", outcome)),
            Ok(outcome) => StepReport::failed(Step::Traffic, format!("{:?}", outcome)),
            Err(e) => StepReport::failed(Step::Traffic, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::error::Result as HarnessResult;
    use async_trait::async_trait;
    use nfv_adapters::{NsoAdapter, OpenStackAdapter};
    use nfv_lcm_common::{AdapterRegistry, OperationKind, OperationStatus};
    use nfv_lcm_test::{nso_fixtures, openstack_fixtures, InMemoryPlane};
    use std::time::Duration;
    use tokio::time::sleep;

    fn config() -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.polling.interval_secs = 10;
        config.polling.max_wait_secs = 120;
        config.traffic.budget_secs = 30;
        config.traffic.retry_interval_secs = 5;
        config
    }

    fn openstack_context(plane: Arc<InMemoryPlane>) -> LcmContext {
        let mut registry = AdapterRegistry::new();
        registry.register(Vendor::OpenStack, move |config| {
            Ok(Box::new(OpenStackAdapter::new(plane.clone(), config)) as Box<dyn VnfmAdapter>)
        });
        LcmContext::with_registry(config(), registry).unwrap()
    }

    fn scenario(id: &str) -> ScenarioConfig {
        ScenarioConfig {
            vnf_instance_id: Some(id.to_string()),
            ..ScenarioConfig::default()
        }
    }

    /// Plays the stack backend: comes up after 25s, goes away 15s after the
    /// delete is issued.
    fn drive_stack(plane: Arc<InMemoryPlane>, id: &'static str) {
        tokio::spawn(async move {
            sleep(Duration::from_secs(25)).await;
            plane.set_document("stacks", id, openstack_fixtures::stack(id, "vnfd-web", "ACTIVE"));
            loop {
                sleep(Duration::from_secs(1)).await;
                if plane.issued_actions().iter().any(|a| a.action == "delete") {
                    break;
                }
            }
            plane.set_state("stacks", id, "provisioning_status", "PENDING_DELETE");
            sleep(Duration::from_secs(15)).await;
            plane.remove("stacks", id);
        });
    }

    struct FixedTraffic(bool);

    #[async_trait]
    impl TrafficGenerator for FixedTraffic {
        async fn start(&self) -> HarnessResult<bool> {
            Ok(self.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lifecycle_passes() {
        let plane = Arc::new(InMemoryPlane::new("orchestration"));
        let context = openstack_context(plane.clone());
        drive_stack(plane.clone(), "web");

        let report = ScenarioRunner::new(&context)
            .with_traffic(Arc::new(FixedTraffic(true)))
            .run("openstack", &scenario("web"))
            .await
            .unwrap();

        let steps: Vec<Step> = report.steps.iter().map(|s| s.step).collect();
        assert_eq!(
            steps,
            vec![Step::Instantiate, Step::Query, Step::Traffic, Step::Terminate]
        );
        assert!(report.passed(), "{:#?}", report);

        let instantiate = report.step(Step::Instantiate).unwrap().wait.unwrap();
        assert_eq!(instantiate.elapsed, Duration::from_secs(30));
        let terminate = report.step(Step::Terminate).unwrap().wait.unwrap();
        assert_eq!(terminate.status, OperationStatus::Success);

        let kinds: Vec<_> = report.operations.iter().map(|r| r.handle.kind()).collect();
        assert_eq!(kinds, vec![OperationKind::Instantiate, OperationKind::Terminate]);
        assert_eq!(report.operations[1].target_existed, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_instantiate_timeout_still_terminates() {
        let plane = Arc::new(InMemoryPlane::new("orchestration"));
        let context = openstack_context(plane.clone());
        plane.set_document("stacks", "web", openstack_fixtures::stack("web", "vnfd-web", "PENDING_CREATE"));

        let report = ScenarioRunner::new(&context)
            .run("openstack", &scenario("web"))
            .await
            .unwrap();

        let instantiate = report.step(Step::Instantiate).unwrap();
        assert!(!instantiate.passed);
        assert!(instantiate.wait.unwrap().timed_out);
        assert!(report.step(Step::Query).is_none());
        // terminate was issued against a stack that is still there
        assert!(report.step(Step::Terminate).is_some());
        assert!(plane.issued_actions().iter().any(|a| a.action == "delete"));
        assert!(!report.passed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_traffic_fails_report() {
        let plane = Arc::new(InMemoryPlane::new("orchestration"));
        let context = openstack_context(plane.clone());
        drive_stack(plane.clone(), "web");

        let report = ScenarioRunner::new(&context)
            .with_traffic(Arc::new(FixedTraffic(false)))
            .run("openstack", &scenario("web"))
            .await
            .unwrap();

        let traffic = report.step(Step::Traffic).unwrap();
        assert!(!traffic.passed);
        assert!(report.step(Step::Terminate).unwrap().passed);
        assert!(!report.passed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_id_then_two_plane_lifecycle() {
        let config_plane = Arc::new(InMemoryPlane::new("config"));
        let runtime_plane = Arc::new(InMemoryPlane::new("runtime"));
        let mut registry = AdapterRegistry::new();
        let (c, r) = (config_plane.clone(), runtime_plane.clone());
        registry.register(Vendor::Nso, move |config| {
            Ok(Box::new(NsoAdapter::new(c.clone(), r.clone(), config)) as Box<dyn VnfmAdapter>)
        });
        let context = LcmContext::with_registry(config(), registry).unwrap();

        // create_id hands out "config-1"; bring both planes up for it
        let (c, r) = (config_plane.clone(), runtime_plane.clone());
        tokio::spawn(async move {
            sleep(Duration::from_secs(15)).await;
            c.set_document(
                nso_fixtures::DEPLOYMENTS,
                "config-1",
                nso_fixtures::service("config-1", "vnfd-fw", Some("reached")),
            );
            r.set_document(nso_fixtures::DEPLOYMENTS, "config-1", nso_fixtures::runtime("active"));
            loop {
                sleep(Duration::from_secs(1)).await;
                if c.issued_actions().iter().any(|a| a.action == "delete") {
                    break;
                }
            }
            r.remove(nso_fixtures::DEPLOYMENTS, "config-1");
            sleep(Duration::from_secs(5)).await;
            c.remove(nso_fixtures::DEPLOYMENTS, "config-1");
        });

        let scenario = ScenarioConfig {
            vnfd_id: Some("vnfd-fw".to_string()),
            ..ScenarioConfig::default()
        };
        let report = ScenarioRunner::new(&context)
            .run("nso", &scenario)
            .await
            .unwrap();

        assert_eq!(report.vnf_instance_id.as_deref(), Some("config-1"));
        assert_eq!(report.steps[0].step, Step::CreateId);
        assert!(report.passed(), "{:#?}", report);
    }

    #[tokio::test]
    async fn test_missing_inputs_is_an_error() {
        let plane = Arc::new(InMemoryPlane::new("orchestration"));
        let context = openstack_context(plane);
        let err = ScenarioRunner::new(&context)
            .run("openstack", &ScenarioConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let plane = Arc::new(InMemoryPlane::new("orchestration"));
        let context = openstack_context(plane.clone());
        plane.fail_next(1);

        let report = ScenarioRunner::new(&context)
            .run("openstack", &scenario("web"))
            .await
            .unwrap();
        // the injected fault rejects the instantiate
        assert!(!report.step(Step::Instantiate).unwrap().passed);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["vendor"], "openstack");
        assert_eq!(json["steps"][0]["step"], "instantiate");
        // the rejected instantiate was never logged; the terminate was
        assert_eq!(json["operations"].as_array().unwrap().len(), 1);
        assert_eq!(json["operations"][0]["handle"]["kind"], "terminate");
        assert!(json["steps"][0]["detail"]
            .as_str()
            .unwrap()
            .contains("injected fault"));
    }
}
