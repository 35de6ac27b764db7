//! Operation handles and vendor identifiers.

use crate::error::{AdapterConstructionError, LcmError, LcmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Orchestration backends the harness knows how to drive.
///
/// The set is closed at compile time; the registry maps each vendor to a
/// constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// ETSI SOL003 VNFM (OpenStack Tacker) reporting per-operation occurrences.
    Tacker,
    /// Single-plane OpenStack orchestration reporting provisioning status.
    OpenStack,
    /// Cisco NSO service plan on top of an independent runtime plane.
    Nso,
}

impl Vendor {
    /// All vendors, in declaration order.
    pub const ALL: [Vendor; 3] = [Vendor::Tacker, Vendor::OpenStack, Vendor::Nso];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Vendor::Tacker => "tacker",
            Vendor::OpenStack => "openstack",
            Vendor::Nso => "nso",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = AdapterConstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tacker" => Ok(Vendor::Tacker),
            "openstack" => Ok(Vendor::OpenStack),
            "nso" => Ok(Vendor::Nso),
            _ => Err(AdapterConstructionError::UnknownVendor(s.to_string())),
        }
    }
}

/// Kind of lifecycle action a handle tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Instantiate,
    Terminate,
    Scale,
    Operate,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Instantiate => "instantiate",
            OperationKind::Terminate => "terminate",
            OperationKind::Scale => "scale",
            OperationKind::Operate => "operate",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend data tying a handle to the work it tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Correlation {
    /// Backend-issued operation occurrence id.
    Occurrence(String),
    /// The resource (stack, deployment, instance) the action targets.
    Resource(String),
}

impl Correlation {
    pub fn id(&self) -> &str {
        match self {
            Correlation::Occurrence(id) | Correlation::Resource(id) => id,
        }
    }
}

/// Opaque correlation token returned by every action-initiating call.
///
/// Callers only pass it back to the adapter that issued it; the fields are
/// exposed for adapters and for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle {
    id: Uuid,
    vendor: Vendor,
    kind: OperationKind,
    correlation: Correlation,
}

impl OperationHandle {
    /// Creates a handle with a fresh id.
    pub fn new(vendor: Vendor, kind: OperationKind, correlation: Correlation) -> Self {
        Self {
            id: Uuid::new_v4(),
            vendor,
            kind,
            correlation,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    /// Fails with `InvalidHandle` unless this handle belongs to `vendor`.
    pub fn ensure_vendor(&self, vendor: Vendor) -> LcmResult<()> {
        if self.vendor == vendor {
            Ok(())
        } else {
            Err(LcmError::InvalidHandle {
                handle: self.to_string(),
                vendor,
            })
        }
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.vendor, self.kind, self.id)
    }
}
