//! In-memory control plane.
//!
//! Records are JSON documents keyed by `(collection, id)`. The plane is
//! passive: issuing an action only journals it and hands back a fresh
//! correlation id, and tests move the backend along with
//! [`InMemoryPlane::set_state`] / [`InMemoryPlane::remove`].

use async_trait::async_trait;
use dashmap::DashMap;
use nfv_lcm_common::{state_of, ActionRequest, ControlPlane, LcmError, LcmResult, Selector};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

type RecordKey = (String, String);

fn key(collection: &str, id: &str) -> RecordKey {
    (collection.to_string(), id.to_string())
}

/// Dashmap-backed [`ControlPlane`] for tests.
pub struct InMemoryPlane {
    name: String,
    records: DashMap<RecordKey, Value>,
    actions: Mutex<Vec<ActionRequest>>,
    next_id: AtomicU64,
    pending_faults: AtomicUsize,
}

impl InMemoryPlane {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: DashMap::new(),
            actions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            pending_faults: AtomicUsize::new(0),
        }
    }

    /// Replaces a whole record.
    pub fn set_document(&self, collection: &str, id: &str, doc: Value) {
        self.records.insert(key(collection, id), doc);
    }

    /// Sets one (possibly dotted) attribute, creating the record and any
    /// intermediate objects as needed.
    pub fn set_state(&self, collection: &str, id: &str, attribute: &str, token: &str) {
        let mut entry = self
            .records
            .entry(key(collection, id))
            .or_insert_with(|| Value::Object(Map::new()));

        let mut node = entry.value_mut();
        let mut path = attribute.split('.').peekable();
        while let Some(segment) = path.next() {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let Value::Object(map) = node else {
                return;
            };
            if path.peek().is_none() {
                map.insert(segment.to_string(), Value::String(token.to_string()));
                return;
            }
            node = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }

    /// Deletes a record, returning it if it existed.
    pub fn remove(&self, collection: &str, id: &str) -> Option<Value> {
        self.records.remove(&key(collection, id)).map(|(_, doc)| doc)
    }

    pub fn contains(&self, collection: &str, id: &str) -> bool {
        self.records.contains_key(&key(collection, id))
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.records.get(&key(collection, id)).map(|doc| doc.clone())
    }

    /// Makes the next `count` calls (of any kind) fail with a backend error.
    pub fn fail_next(&self, count: usize) {
        self.pending_faults.store(count, Ordering::SeqCst);
    }

    /// Actions issued so far, oldest first.
    pub fn issued_actions(&self) -> Vec<ActionRequest> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn inject_fault(&self, operation: &str) -> LcmResult<()> {
        let faulted = self
            .pending_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if faulted {
            tracing::debug!(plane = %self.name, operation, "Injecting backend fault");
            Err(LcmError::backend(&self.name, operation, "injected fault"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ControlPlane for InMemoryPlane {
    fn name(&self) -> &str {
        &self.name
    }

    async fn issue_action(&self, request: &ActionRequest) -> LcmResult<String> {
        self.inject_fault("issue_action")?;
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}-{}", self.name, id))
    }

    async fn probe_state(&self, selector: &Selector) -> LcmResult<Option<String>> {
        let doc = self.read_document(selector).await?;
        Ok(state_of(doc.as_ref(), &selector.attribute))
    }

    async fn read_document(&self, selector: &Selector) -> LcmResult<Option<Value>> {
        self.inject_fault("read_document")?;
        Ok(self.document(&selector.collection, &selector.id))
    }
}
