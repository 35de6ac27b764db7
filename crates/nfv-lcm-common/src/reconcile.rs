//! Probe sequencing that turns plane observations into an [`OperationStatus`].
//!
//! Two shapes are supported:
//!
//! - [`SinglePlaneProbe`]: one backend record carries the state token.
//! - [`TwoPlaneProbe`]: a configuration plane (A) publishes a readiness
//!   marker and a runtime plane (B) reports placement state. Instantiate
//!   reads A then B; terminate reads B then A.
//!
//! Probes run strictly in order and stop as soon as the outcome is known.
//! Nothing here writes to a plane.

use crate::error::{LcmError, LcmResult};
use crate::handle::OperationKind;
use crate::plane::{ControlPlane, Selector};
use crate::status::{OperationStatus, StatusTable};

/// What a plane holds for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Observation {
    Absent,
    /// Record exists but carries no state token yet.
    Untagged,
    Token(String),
}

async fn observe(plane: &dyn ControlPlane, selector: &Selector) -> LcmResult<Observation> {
    let observation = match plane.probe_state(selector).await? {
        None => Observation::Absent,
        Some(token) if token.is_empty() => Observation::Untagged,
        Some(token) => Observation::Token(token),
    };
    tracing::debug!(plane = plane.name(), selector = %selector, ?observation, "Probed plane");
    Ok(observation)
}

fn never_existed(operation: OperationKind, selector: &Selector) -> LcmError {
    LcmError::invalid_precondition(
        operation.as_str(),
        &selector.id,
        "target did not exist when the operation was issued",
    )
}

/// Reconciles a backend that exposes status as one record attribute.
#[derive(Clone, Copy)]
pub struct SinglePlaneProbe<'a> {
    plane: &'a dyn ControlPlane,
    table: &'a StatusTable,
}

impl<'a> SinglePlaneProbe<'a> {
    pub fn new(plane: &'a dyn ControlPlane, table: &'a StatusTable) -> Self {
        Self { plane, table }
    }

    /// Computes the status of an operation of `kind` on the record at
    /// `selector`.
    ///
    /// `target_existed` is the pre-terminate existence check, if one was
    /// made.
    pub async fn status(
        &self,
        kind: OperationKind,
        selector: &Selector,
        target_existed: Option<bool>,
    ) -> LcmResult<OperationStatus> {
        match (observe(self.plane, selector).await?, kind) {
            (Observation::Absent, OperationKind::Terminate) => {
                if target_existed == Some(false) {
                    Err(never_existed(kind, selector))
                } else {
                    Ok(OperationStatus::Success)
                }
            }
            (Observation::Absent, OperationKind::Instantiate) => Ok(OperationStatus::Pending),
            (Observation::Absent, _) => Err(LcmError::invalid_precondition(
                kind.as_str(),
                &selector.id,
                "resource not found",
            )),
            (Observation::Untagged, _) => Ok(OperationStatus::Pending),
            // A record that is still there has not been terminated yet,
            // whatever its token says, unless the token reports failure.
            (Observation::Token(raw), OperationKind::Terminate) => {
                match self.table.normalize(&raw)? {
                    OperationStatus::Failed => Ok(OperationStatus::Failed),
                    _ => Ok(OperationStatus::Pending),
                }
            }
            (Observation::Token(raw), _) => self.table.normalize(&raw),
        }
    }
}

/// Reconciles a backend split across a configuration plane and a runtime
/// plane.
#[derive(Clone, Copy)]
pub struct TwoPlaneProbe<'a> {
    config: &'a dyn ControlPlane,
    config_table: &'a StatusTable,
    runtime: &'a dyn ControlPlane,
    runtime_table: &'a StatusTable,
}

impl<'a> TwoPlaneProbe<'a> {
    /// `config_table` maps the readiness marker: `Success` for reached,
    /// `Pending` for not reached, `Failed` for failed.
    pub fn new(
        config: &'a dyn ControlPlane,
        config_table: &'a StatusTable,
        runtime: &'a dyn ControlPlane,
        runtime_table: &'a StatusTable,
    ) -> Self {
        Self {
            config,
            config_table,
            runtime,
            runtime_table,
        }
    }

    /// Instantiate: readiness marker on A first, then B must be active.
    pub async fn instantiate_status(
        &self,
        config: &Selector,
        runtime: &Selector,
    ) -> LcmResult<OperationStatus> {
        let marker = match observe(self.config, config).await? {
            Observation::Absent | Observation::Untagged => return Ok(OperationStatus::Pending),
            Observation::Token(raw) => self.config_table.normalize(&raw)?,
        };
        match marker {
            OperationStatus::Failed => return Ok(OperationStatus::Failed),
            OperationStatus::Pending => return Ok(OperationStatus::Pending),
            OperationStatus::Success => {}
        }

        // A claims the service is ready; B has to agree.
        match observe(self.runtime, runtime).await? {
            Observation::Token(raw) => match self.runtime_table.normalize(&raw)? {
                OperationStatus::Success => Ok(OperationStatus::Success),
                _ => Ok(OperationStatus::Failed),
            },
            Observation::Absent | Observation::Untagged => Ok(OperationStatus::Failed),
        }
    }

    /// Terminate: B must clear first, then A.
    pub async fn terminate_status(
        &self,
        config: &Selector,
        runtime: &Selector,
        target_existed: Option<bool>,
    ) -> LcmResult<OperationStatus> {
        match observe(self.runtime, runtime).await? {
            Observation::Token(raw) => {
                return match self.runtime_table.normalize(&raw)? {
                    OperationStatus::Failed => Ok(OperationStatus::Failed),
                    _ => Ok(OperationStatus::Pending),
                };
            }
            Observation::Untagged => return Ok(OperationStatus::Pending),
            Observation::Absent => {}
        }

        match observe(self.config, config).await? {
            Observation::Absent if target_existed == Some(false) => {
                Err(never_existed(OperationKind::Terminate, config))
            }
            Observation::Absent => Ok(OperationStatus::Success),
            _ => Ok(OperationStatus::Pending),
        }
    }
}
