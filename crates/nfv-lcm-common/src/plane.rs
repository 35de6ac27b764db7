//! Control-plane capability consumed by the reconciliation engine.
//!
//! A control plane is one independently operated backend system (a VNFM
//! REST endpoint, a NETCONF/RESTCONF service manager, a VIM API). The core
//! depends on it only through [`ControlPlane`]; the wire protocol behind it
//! is the implementation's business.

use crate::error::LcmResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured address of one attribute of one backend record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    /// Record collection (e.g., "vnf_lcm_op_occs", "stacks", "plan").
    pub collection: String,
    /// Record id within the collection.
    pub id: String,
    /// Attribute holding the state token.
    pub attribute: String,
}

impl Selector {
    pub fn new(
        collection: impl Into<String>,
        id: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.collection, self.id, self.attribute)
    }
}

/// An action to issue against a control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Record collection the action applies to.
    pub collection: String,
    /// Target record; `None` for actions that create a record.
    pub target: Option<String>,
    /// Action name (e.g., "create", "instantiate", "delete").
    pub action: String,
    /// Protocol-specific payload.
    #[serde(default)]
    pub body: serde_json::Value,
}

impl ActionRequest {
    /// Creates an action that produces a new record in `collection`.
    pub fn create(collection: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            collection: collection.into(),
            target: None,
            action: "create".to_string(),
            body,
        }
    }

    /// Creates an action against an existing record.
    pub fn on(
        collection: impl Into<String>,
        target: impl Into<String>,
        action: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            collection: collection.into(),
            target: Some(target.into()),
            action: action.into(),
            body,
        }
    }
}

/// Probe/action capability of one backend plane.
///
/// Transport failures are reported as
/// [`LcmError::Backend`](crate::LcmError::Backend). A record that does not
/// exist is *not* an error: `probe_state` and `read_document` return
/// `Ok(None)` and the caller decides what absence means.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Returns the plane name (for logging and error reports).
    fn name(&self) -> &str;

    /// Issues an action and returns the backend's correlation id (the new
    /// record id for creates, the operation occurrence id otherwise).
    async fn issue_action(&self, request: &ActionRequest) -> LcmResult<String>;

    /// Reads the raw state token at `selector`.
    ///
    /// Returns `Ok(None)` if the record is absent and `Ok(Some(""))` if the
    /// record exists but carries no token yet. See [`state_of`].
    async fn probe_state(&self, selector: &Selector) -> LcmResult<Option<String>>;

    /// Reads the whole record addressed by `selector` (attribute ignored).
    async fn read_document(&self, selector: &Selector) -> LcmResult<Option<serde_json::Value>>;
}

/// Reads the state token at `attribute` in a record document.
///
/// `attribute` may be a dotted path into nested objects. Strings are
/// returned as-is; booleans and numbers are rendered. Anything else
/// (missing, null, object, array) is treated as absent.
pub fn extract_token(document: &serde_json::Value, attribute: &str) -> Option<String> {
    let value = attribute
        .split('.')
        .try_fold(document, |node, key| node.get(key))?;
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Answers a [`ControlPlane::probe_state`] call from a whole record: `None`
/// when the record is absent, an empty token when it has none at `attribute`.
pub fn state_of(document: Option<&serde_json::Value>, attribute: &str) -> Option<String> {
    document.map(|doc| extract_token(doc, attribute).unwrap_or_default())
}
