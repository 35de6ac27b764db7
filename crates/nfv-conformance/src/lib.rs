//! NFV lifecycle conformance harness.
//!
//! Ties the adapters and the status reconciliation core into runnable
//! scenarios:
//!
//! - [`HarnessConfig`]: TOML configuration (polling, vendors, traffic,
//!   scenario inputs)
//! - [`LcmContext`]: owns the adapter registry, record schemas and config
//! - [`ScenarioRunner`]: create → instantiate → query → traffic → terminate
//!   with a JSON-serializable [`ScenarioReport`]
//! - [`TrafficWorker`]: cancellable background traffic check

pub mod config;
pub mod context;
pub mod error;
pub mod scenario;
pub mod traffic;

pub use config::{HarnessConfig, PollingConfig, ScenarioConfig, TrafficConfig, DEFAULT_CONFIG_PATH};
pub use context::LcmContext;
pub use error::{HarnessError, Result};
pub use scenario::{ScenarioReport, ScenarioRunner, Step, StepReport};
pub use traffic::{TcpConnectProbe, TrafficGenerator, TrafficOutcome, TrafficWorker};
