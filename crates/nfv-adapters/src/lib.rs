//! Vendor adapters for the NFV lifecycle conformance harness.
//!
//! Each adapter implements [`VnfmAdapter`] for one orchestration backend:
//!
//! - [`TackerAdapter`]: SOL003 VNFM with per-operation occurrence records
//! - [`OpenStackAdapter`]: single-plane stack orchestration
//! - [`NsoAdapter`]: service manager split over a configuration plane and a
//!   runtime plane
//!
//! All of them talk to their backends through [`ControlPlane`]; in
//! production that is a [`RestPlane`], in tests an in-memory plane.
//!
//! [`ControlPlane`]: nfv_lcm_common::ControlPlane

mod nso;
mod openstack;
mod rest;
mod tacker;

pub use nso::{NsoAdapter, CONFIG_PLANE, PLAN_TABLE, RUNTIME_PLANE, RUNTIME_TABLE};
pub use openstack::{OpenStackAdapter, ORCHESTRATION_PLANE, PROVISIONING_TABLE};
pub use rest::RestPlane;
pub use tacker::{TackerAdapter, OPERATION_STATE_TABLE, VNFLCM_PLANE};

use nfv_lcm_common::{AdapterRegistry, Vendor, VnfmAdapter};

/// Returns a registry with a REST-backed constructor for every vendor.
pub fn builtin_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Vendor::Tacker, |config| {
        Ok(Box::new(TackerAdapter::from_config(config)?) as Box<dyn VnfmAdapter>)
    });
    registry.register(Vendor::OpenStack, |config| {
        Ok(Box::new(OpenStackAdapter::from_config(config)?) as Box<dyn VnfmAdapter>)
    });
    registry.register(Vendor::Nso, |config| {
        Ok(Box::new(NsoAdapter::from_config(config)?) as Box<dyn VnfmAdapter>)
    });
    registry
}
