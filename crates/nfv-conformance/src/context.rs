//! Harness context.
//!
//! Owns everything that used to live in process-wide caches: the adapter
//! registry, the record schemas and the loaded configuration. Build one per
//! run and pass it by reference.

use crate::config::HarnessConfig;
use crate::error::Result;
use nfv_lcm_common::{AdapterRegistry, Vendor, VnfmAdapter};
use nfv_types::SchemaRegistry;

/// Registry, schemas and configuration for one harness run.
#[derive(Debug)]
pub struct LcmContext {
    registry: AdapterRegistry,
    schemas: SchemaRegistry,
    config: HarnessConfig,
}

impl LcmContext {
    /// Validates `config` and builds a context with the REST-backed
    /// constructors for every vendor.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        Self::with_registry(config, nfv_adapters::builtin_registry())
    }

    /// Builds a context around an explicit registry.
    pub fn with_registry(config: HarnessConfig, registry: AdapterRegistry) -> Result<Self> {
        Ok(Self {
            registry,
            schemas: SchemaRegistry::builtin()?,
            config,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Vendors with a registered constructor.
    pub fn vendors(&self) -> Vec<Vendor> {
        self.registry.vendors()
    }

    /// Constructs an adapter for `vendor` from its configuration section.
    pub fn adapter(&self, vendor: &str) -> Result<Box<dyn VnfmAdapter>> {
        let parsed: Vendor = vendor.parse()?;
        let config = self.config.vendor_config(parsed);
        let adapter = self.registry.construct(vendor, &config)?;
        Ok(adapter)
    }
}
