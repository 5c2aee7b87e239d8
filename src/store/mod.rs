//! Record store adapter.
//!
//! The engine never owns data. It reads live snapshots of independently
//! keyed collections from a multi-writer document store and writes single
//! records back. [`RecordStore`] is the seam; [`memory::MemoryStore`] is
//! the in-process adapter used by embedders and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::{Display, Error};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

pub mod memory;

/// One record as stored: a raw JSON document.
pub type Document = serde_json::Value;

/// Full contents of a collection, keyed by record key.
pub type SnapshotMap = BTreeMap<String, Document>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Employees,
    Shifts,
    Roster,
    LeaveRequests,
    Attendance,
    SwapRequests,
    ConditionReports,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Employees,
        Collection::Shifts,
        Collection::Roster,
        Collection::LeaveRequests,
        Collection::Attendance,
        Collection::SwapRequests,
        Collection::ConditionReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Employees => "employees",
            Collection::Shifts => "shifts",
            Collection::Roster => "roster",
            Collection::LeaveRequests => "leave_requests",
            Collection::Attendance => "attendance",
            Collection::SwapRequests => "swap_requests",
            Collection::ConditionReports => "condition_reports",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key for day-indexed collections (roster, attendance).
pub fn day_key(date: NaiveDate, employee_id: &str) -> String {
    format!("{}:{}", date, employee_id)
}

#[derive(Debug, Display, Error)]
pub enum StoreError {
    /// Transient read/subscribe failure. Retry policy belongs to the
    /// adapter, not the engine.
    #[display(fmt = "collection {} is unavailable", collection)]
    Unavailable {
        #[error(not(source))]
        collection: &'static str,
    },

    #[display(fmt = "record {} not found", key)]
    NotFound {
        #[error(not(source))]
        key: String,
    },

    /// Conditional write refused; carries the status actually stored.
    #[display(fmt = "record already {}", current)]
    Conflict {
        #[error(not(source))]
        current: String,
    },

    #[display(fmt = "failed to decode record {}: {}", key, message)]
    Decode { key: String, message: String },

    #[display(fmt = "failed to encode record: {}", message)]
    Encode {
        #[error(not(source))]
        message: String,
    },
}

/// Live change feed for one collection. Dropping (or `release`-ing) the
/// subscription stops the recomputation triggers it feeds.
pub struct Subscription {
    rx: watch::Receiver<u64>,
    guard: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(rx: watch::Receiver<u64>, guard: Box<dyn FnOnce() + Send>) -> Self {
        Subscription {
            rx,
            guard: Some(guard),
        }
    }

    /// Waits for the next change. Returns false once the store side is
    /// gone and no further notifications can arrive.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub fn release(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.guard.take() {
            release();
        }
    }
}

/// Eventually-consistent, multi-writer document source with per-collection
/// change notification. There is no transaction boundary across
/// collections; callers must recompute from fresh snapshots.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current snapshot of a whole collection.
    async fn fetch(&self, collection: Collection) -> Result<SnapshotMap, StoreError>;

    async fn get(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Option<Document>, StoreError>;

    async fn put(
        &self,
        collection: Collection,
        key: &str,
        doc: Document,
    ) -> Result<(), StoreError>;

    /// Removes the record entirely. Deleting a missing key is a no-op.
    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError>;

    /// Compare-and-swap on the record's `status` field: the replacement
    /// is written only while the stored status still equals `expected`.
    /// Fails with [`StoreError::Conflict`] otherwise.
    async fn put_if_status(
        &self,
        collection: Collection,
        key: &str,
        expected: &str,
        doc: Document,
    ) -> Result<(), StoreError>;

    fn subscribe(&self, collection: Collection) -> Result<Subscription, StoreError>;
}

/// Decodes a stored document into a typed record.
pub fn decode<T: DeserializeOwned>(key: &str, doc: &Document) -> Result<T, StoreError> {
    serde_json::from_value(doc.clone()).map_err(|e| StoreError::Decode {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Encodes a typed record into its stored document form.
pub fn encode<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Encode {
        message: e.to_string(),
    })
}
