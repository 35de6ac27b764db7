//! Vendor → adapter constructor registry.
//!
//! The registry is plain owned state: build it once (eagerly) and hand it to
//! whoever constructs adapters. There is no process-wide cache, so there is
//! nothing to race on at first use.

use crate::adapter::VnfmAdapter;
use crate::error::AdapterConstructionError;
use crate::handle::Vendor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Per-vendor adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Plane name → base endpoint URL.
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,

    /// VIM connection id reported in resource handles.
    #[serde(default = "default_vim_connection_id")]
    pub vim_connection_id: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Probe the target before issuing a terminate and refuse to treat later
    /// absence as success if it never existed.
    #[serde(default = "default_verify_terminate_target")]
    pub verify_terminate_target: bool,
}

fn default_vim_connection_id() -> String {
    "default".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_verify_terminate_target() -> bool {
    true
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            endpoints: BTreeMap::new(),
            vim_connection_id: default_vim_connection_id(),
            request_timeout_secs: default_request_timeout(),
            verify_terminate_target: default_verify_terminate_target(),
        }
    }
}

impl AdapterConfig {
    /// Adds an endpoint for a plane.
    pub fn with_endpoint(mut self, plane: impl Into<String>, url: impl Into<String>) -> Self {
        self.endpoints.insert(plane.into(), url.into());
        self
    }

    /// Returns the endpoint for `plane`, failing construction if absent.
    pub fn endpoint(&self, vendor: Vendor, plane: &str) -> Result<&str, AdapterConstructionError> {
        self.endpoints
            .get(plane)
            .map(String::as_str)
            .ok_or_else(|| {
                AdapterConstructionError::failed(vendor, format!("missing endpoint for plane '{}'", plane))
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Constructor for one vendor's adapter.
pub type AdapterFactory = Arc<
    dyn Fn(&AdapterConfig) -> Result<Box<dyn VnfmAdapter>, AdapterConstructionError> + Send + Sync,
>;

/// Maps vendors to adapter constructors.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: HashMap<Vendor, AdapterFactory>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("vendors", &self.vendors())
            .finish()
    }
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the constructor for `vendor`.
    ///
    /// Returns the previously registered constructor, if any.
    pub fn register<F>(&mut self, vendor: Vendor, factory: F) -> Option<AdapterFactory>
    where
        F: Fn(&AdapterConfig) -> Result<Box<dyn VnfmAdapter>, AdapterConstructionError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(vendor, Arc::new(factory))
    }

    /// Resolves a vendor identifier to its constructor.
    pub fn resolve(&self, vendor: &str) -> Result<AdapterFactory, AdapterConstructionError> {
        let vendor: Vendor = vendor.parse()?;
        self.factories
            .get(&vendor)
            .cloned()
            .ok_or(AdapterConstructionError::ConstructorMissing(vendor))
    }

    /// Resolves `vendor` and constructs an adapter from `config`.
    pub fn construct(
        &self,
        vendor: &str,
        config: &AdapterConfig,
    ) -> Result<Box<dyn VnfmAdapter>, AdapterConstructionError> {
        let factory = self.resolve(vendor)?;
        match factory(config) {
            Ok(adapter) => {
                tracing::info!(vendor = %adapter.vendor(), "Constructed adapter");
                Ok(adapter)
            }
            Err(e) => {
                tracing::error!(vendor, error = %e, "Adapter construction failed");
                Err(e)
            }
        }
    }

    /// Returns the vendors with a registered constructor, sorted.
    pub fn vendors(&self) -> Vec<Vendor> {
        let mut vendors: Vec<_> = self.factories.keys().copied().collect();
        vendors.sort();
        vendors
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
