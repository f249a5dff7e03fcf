//! In-flight upload records.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use ontime_core::types::{UploadRecord, UploadStatus};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, UploadRecord>,
    order: Vec<Uuid>,
}

/// Upload records keyed by id, listed in selection order.
///
/// Records are never removed; finished uploads stay in their terminal state.
#[derive(Default)]
pub struct UploadTracker {
    inner: Mutex<Inner>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pending record for a newly selected file.
    pub fn create(&self, file_name: &str) -> UploadRecord {
        let record = UploadRecord::new(file_name);
        if let Ok(mut inner) = self.inner.lock() {
            inner.order.push(record.id);
            inner.records.insert(record.id, record.clone());
        }
        record
    }

    /// Apply `f` to a record and return the updated copy.
    pub fn update<F>(&self, id: Uuid, f: F) -> Option<UploadRecord>
    where
        F: FnOnce(&mut UploadRecord),
    {
        let mut inner = self.inner.lock().ok()?;
        let record = inner.records.get_mut(&id)?;
        f(record);
        record.updated_at = Utc::now();
        Some(record.clone())
    }

    pub fn set_status(&self, id: Uuid, status: UploadStatus) -> Option<UploadRecord> {
        self.update(id, |r| r.status = status)
    }

    pub fn get(&self, id: Uuid) -> Option<UploadRecord> {
        self.inner.lock().ok()?.records.get(&id).cloned()
    }

    /// All records in selection order.
    pub fn list(&self) -> Vec<UploadRecord> {
        let inner = match self.inner.lock() {
            Ok(i) => i,
            Err(_) => return vec![],
        };
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }

    /// Records not yet in a terminal state.
    pub fn in_flight(&self) -> usize {
        self.list()
            .iter()
            .filter(|r| !r.status.is_terminal())
            .count()
    }
}
