//! Integration test infrastructure for NFV lifecycle adapters
//!
//! Provides:
//! - In-memory control planes with fault injection
//! - Record document fixtures per vendor
//! - The two-plane reconciliation golden table

pub mod fixtures;
mod plane;

pub use fixtures::*;
pub use plane::InMemoryPlane;
