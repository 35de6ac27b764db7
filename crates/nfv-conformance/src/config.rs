//! Configuration file support for nfvconf
//!
//! Loads and validates harness configuration from TOML files.
//! Default location: /etc/nfv/nfvconf.toml

use crate::error::{HarnessError, Result};
use nfv_lcm_common::{AdapterConfig, Vendor, WaitOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/nfv/nfvconf.toml";

/// Status polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between status polls in seconds
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    /// Time budget for one lifecycle operation in seconds
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
}

/// Traffic check configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficConfig {
    /// Run the traffic step after instantiation
    #[serde(default)]
    pub enabled: bool,

    /// Address (`host:port`) the instantiated VNF should accept connections on
    #[serde(default)]
    pub target: Option<String>,

    /// Delay between generator attempts in seconds
    #[serde(default = "default_traffic_retry_interval")]
    pub retry_interval_secs: u64,

    /// Time budget for the traffic step in seconds
    #[serde(default = "default_traffic_budget")]
    pub budget_secs: u64,

    /// Per-attempt connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Scenario inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Descriptor to create a new instance from
    #[serde(default)]
    pub vnfd_id: Option<String>,

    /// Existing instance to drive instead of creating one
    #[serde(default)]
    pub vnf_instance_id: Option<String>,

    /// Name given to a newly created instance
    #[serde(default)]
    pub vnf_instance_name: Option<String>,

    /// Deployment flavour to instantiate
    #[serde(default = "default_flavour")]
    pub flavour_id: String,

    /// Graceful termination timeout in seconds; forceful when unset
    #[serde(default)]
    pub graceful_termination_secs: Option<u64>,
}

/// Complete nfvconf configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Polling configuration
    #[serde(default)]
    pub polling: PollingConfig,

    /// Per-vendor adapter configuration, keyed by vendor name
    #[serde(default)]
    pub vendors: BTreeMap<String, AdapterConfig>,

    /// Traffic check configuration
    #[serde(default)]
    pub traffic: TrafficConfig,

    /// Scenario inputs
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_wait() -> u64 {
    600
}

fn default_traffic_retry_interval() -> u64 {
    5
}

fn default_traffic_budget() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    3
}

fn default_flavour() -> String {
    "default".to_string()
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            max_wait_secs: default_max_wait(),
        }
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target: None,
            retry_interval_secs: default_traffic_retry_interval(),
            budget_secs: default_traffic_budget(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            vnfd_id: None,
            vnf_instance_id: None,
            vnf_instance_name: None,
            flavour_id: default_flavour(),
            graceful_termination_secs: None,
        }
    }
}

impl TrafficConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.budget_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                HarnessError::Configuration(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(HarnessError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            HarnessError::Configuration(format!("Failed to serialize config: {}", e))
        })?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    /// Get per-operation wait budget as Duration
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.polling.max_wait_secs)
    }

    /// Polling parameters for [`nfv_lcm_common::wait_for_completion`]
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new(self.poll_interval(), self.max_wait())
    }

    /// Adapter configuration for `vendor`
    ///
    /// Section names are matched case-insensitively. A vendor without a
    /// section gets defaults (and will fail construction for lack of
    /// endpoints).
    pub fn vendor_config(&self, vendor: Vendor) -> AdapterConfig {
        self.vendors
            .iter()
            .find(|(name, _)| name.parse::<Vendor>().ok() == Some(vendor))
            .map(|(_, config)| config.clone())
            .unwrap_or_default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_secs == 0 {
            return Err(HarnessError::Configuration(
                "polling.interval_secs must be > 0".to_string(),
            ));
        }

        for (name, vendor) in &self.vendors {
            if name.parse::<Vendor>().is_err() {
                return Err(HarnessError::Configuration(format!(
                    "unknown vendor section [vendors.{}]",
                    name
                )));
            }
            if vendor.request_timeout_secs == 0 {
                return Err(HarnessError::Configuration(format!(
                    "vendors.{}.request_timeout_secs must be > 0",
                    name
                )));
            }
        }

        if self.traffic.enabled {
            if self.traffic.target.is_none() {
                return Err(HarnessError::Configuration(
                    "traffic.target is required when traffic is enabled".to_string(),
                ));
            }
            if self.traffic.retry_interval_secs == 0 {
                return Err(HarnessError::Configuration(
                    "traffic.retry_interval_secs must be > 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}
