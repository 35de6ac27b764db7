//! In-memory log of handles issued by an adapter.
//!
//! Entries are only ever created by [`OperationLog::record`]; lookups for
//! unknown handles return `None` and never insert placeholders.

use crate::handle::OperationHandle;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// One issued action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRecord {
    #[serde(skip)]
    seq: u64,
    pub handle: OperationHandle,
    pub issued_at: DateTime<Utc>,
    /// Whether the target was observed to exist right before a terminate
    /// was issued. `None` when no check was made.
    pub target_existed: Option<bool>,
}

/// Handles issued by one adapter over its lifetime.
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    entries: HashMap<Uuid, OperationRecord>,
    next_seq: u64,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an issued handle.
    pub fn record(&mut self, handle: &OperationHandle) {
        self.insert(handle, None);
    }

    /// Records a terminate handle together with the pre-terminate existence
    /// check.
    pub fn record_terminate(&mut self, handle: &OperationHandle, target_existed: bool) {
        self.insert(handle, Some(target_existed));
    }

    fn insert(&mut self, handle: &OperationHandle, target_existed: Option<bool>) {
        tracing::debug!(handle = %handle, correlation = handle.correlation().id(), "Recorded operation");
        self.next_seq += 1;
        self.entries.insert(
            handle.id(),
            OperationRecord {
                seq: self.next_seq,
                handle: handle.clone(),
                issued_at: Utc::now(),
                target_existed,
            },
        );
    }

    /// Returns the record for a handle.
    ///
    /// Returns `None` if the handle was not issued through this log.
    pub fn get(&self, handle: &OperationHandle) -> Option<&OperationRecord> {
        self.entries.get(&handle.id())
    }

    /// Returns the pre-terminate existence check for a handle, if one was made.
    pub fn target_existed(&self, handle: &OperationHandle) -> Option<bool> {
        self.get(handle).and_then(|r| r.target_existed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns every record in the order the handles were issued.
    pub fn records(&self) -> Vec<&OperationRecord> {
        let mut records: Vec<_> = self.entries.values().collect();
        records.sort_by_key(|r| r.seq);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{Correlation, OperationKind, Vendor};

    fn handle(kind: OperationKind) -> OperationHandle {
        OperationHandle::new(Vendor::OpenStack, kind, Correlation::Resource("stack-1".to_string()))
    }

    #[test]
    fn test_lookup_never_inserts() {
        let log = OperationLog::new();
        let h = handle(OperationKind::Instantiate);
        assert!(log.get(&h).is_none());
        assert!(log.target_existed(&h).is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn test_record_and_lookup() {
        let mut log = OperationLog::new();
        let inst = handle(OperationKind::Instantiate);
        let term = handle(OperationKind::Terminate);
        log.record(&inst);
        log.record_terminate(&term, true);

        assert_eq!(log.len(), 2);
        assert!(log.get(&inst).is_some());
        assert_eq!(log.target_existed(&inst), None);
        assert_eq!(log.target_existed(&term), Some(true));
    }

    #[test]
    fn test_records_in_issue_order() {
        let mut log = OperationLog::new();
        let handles: Vec<_> = [
            OperationKind::Instantiate,
            OperationKind::Scale,
            OperationKind::Operate,
            OperationKind::Terminate,
        ]
        .into_iter()
        .map(handle)
        .collect();
        for h in &handles {
            log.record(h);
        }

        let issued: Vec<_> = log.records().into_iter().map(|r| r.handle.clone()).collect();
        assert_eq!(issued, handles);
    }

    #[test]
    fn test_record_serializes_without_sequence() {
        let mut log = OperationLog::new();
        let term = handle(OperationKind::Terminate);
        log.record_terminate(&term, false);

        let json = serde_json::to_value(log.records()[0]).unwrap();
        assert_eq!(json["target_existed"], false);
        assert!(json.get("seq").is_none());
        assert!(json.get("issued_at").is_some());
    }
}
