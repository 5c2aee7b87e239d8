use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::watch;

use super::{Collection, Document, RecordStore, SnapshotMap, StoreError, Subscription};

struct Shelf {
    docs: SnapshotMap,
    revision: u64,
    unavailable: bool,
    tx: watch::Sender<u64>,
    subscribers: Arc<AtomicUsize>,
}

impl Shelf {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(0u64);
        Shelf {
            docs: SnapshotMap::new(),
            revision: 0,
            unavailable: false,
            tx,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
        self.tx.send_replace(self.revision);
    }
}

/// In-process [`RecordStore`]: one shelf per collection, last write wins,
/// change notification per collection. Collections can be flipped
/// unavailable to exercise transient-failure paths.
pub struct MemoryStore {
    shelves: RwLock<HashMap<Collection, Shelf>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut shelves = HashMap::new();
        for collection in Collection::ALL {
            shelves.insert(collection, Shelf::new());
        }
        MemoryStore {
            shelves: RwLock::new(shelves),
        }
    }

    /// Simulates a connectivity outage on one collection. Flipping the
    /// flag wakes subscribers so consumers re-read promptly.
    pub fn set_unavailable(&self, collection: Collection, unavailable: bool) {
        let mut guard = self
            .shelves
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(shelf) = guard.get_mut(&collection) {
            shelf.unavailable = unavailable;
            shelf.bump();
        }
    }

    pub fn subscriber_count(&self, collection: Collection) -> usize {
        let guard = self.shelves.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(&collection)
            .map(|shelf| shelf.subscribers.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(&self, collection: Collection) -> Result<SnapshotMap, StoreError> {
        let guard = self.shelves.read().unwrap_or_else(PoisonError::into_inner);
        let shelf = guard.get(&collection).ok_or(StoreError::Unavailable {
            collection: collection.as_str(),
        })?;
        if shelf.unavailable {
            return Err(StoreError::Unavailable {
                collection: collection.as_str(),
            });
        }
        Ok(shelf.docs.clone())
    }

    async fn get(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Option<Document>, StoreError> {
        let guard = self.shelves.read().unwrap_or_else(PoisonError::into_inner);
        let shelf = guard.get(&collection).ok_or(StoreError::Unavailable {
            collection: collection.as_str(),
        })?;
        if shelf.unavailable {
            return Err(StoreError::Unavailable {
                collection: collection.as_str(),
            });
        }
        Ok(shelf.docs.get(key).cloned())
    }

    async fn put(
        &self,
        collection: Collection,
        key: &str,
        doc: Document,
    ) -> Result<(), StoreError> {
        let mut guard = self
            .shelves
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let shelf = guard.get_mut(&collection).ok_or(StoreError::Unavailable {
            collection: collection.as_str(),
        })?;
        if shelf.unavailable {
            return Err(StoreError::Unavailable {
                collection: collection.as_str(),
            });
        }
        shelf.docs.insert(key.to_string(), doc);
        shelf.bump();
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let mut guard = self
            .shelves
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let shelf = guard.get_mut(&collection).ok_or(StoreError::Unavailable {
            collection: collection.as_str(),
        })?;
        if shelf.unavailable {
            return Err(StoreError::Unavailable {
                collection: collection.as_str(),
            });
        }
        if shelf.docs.remove(key).is_some() {
            shelf.bump();
        }
        Ok(())
    }

    async fn put_if_status(
        &self,
        collection: Collection,
        key: &str,
        expected: &str,
        doc: Document,
    ) -> Result<(), StoreError> {
        let mut guard = self
            .shelves
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let shelf = guard.get_mut(&collection).ok_or(StoreError::Unavailable {
            collection: collection.as_str(),
        })?;
        if shelf.unavailable {
            return Err(StoreError::Unavailable {
                collection: collection.as_str(),
            });
        }
        let current = match shelf.docs.get(key) {
            Some(stored) => stored
                .get("status")
                .and_then(Document::as_str)
                .unwrap_or_default()
                .to_string(),
            None => {
                return Err(StoreError::NotFound {
                    key: key.to_string(),
                });
            }
        };
        if current != expected {
            return Err(StoreError::Conflict { current });
        }
        shelf.docs.insert(key.to_string(), doc);
        shelf.bump();
        Ok(())
    }

    fn subscribe(&self, collection: Collection) -> Result<Subscription, StoreError> {
        let guard = self.shelves.read().unwrap_or_else(PoisonError::into_inner);
        let shelf = guard.get(&collection).ok_or(StoreError::Unavailable {
            collection: collection.as_str(),
        })?;
        if shelf.unavailable {
            return Err(StoreError::Unavailable {
                collection: collection.as_str(),
            });
        }
        let counter = Arc::clone(&shelf.subscribers);
        counter.fetch_add(1, Ordering::SeqCst);
        let rx = shelf.tx.subscribe();
        Ok(Subscription::new(
            rx,
            Box::new(move || {
                counter.fetch_sub(1, Ordering::SeqCst);
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn put_notifies_subscribers() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(Collection::Attendance).unwrap();

        store
            .put(Collection::Attendance, "2024-03-04:e1", json!({"status": "present"}))
            .await
            .unwrap();

        assert!(sub.changed().await);
        let snapshot = store.fetch(Collection::Attendance).await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_collection_fails_reads_and_writes() {
        let store = MemoryStore::new();
        store.set_unavailable(Collection::LeaveRequests, true);

        assert!(matches!(
            store.fetch(Collection::LeaveRequests).await,
            Err(StoreError::Unavailable { collection: "leave_requests" })
        ));
        assert!(matches!(
            store
                .put(Collection::LeaveRequests, "l1", json!({}))
                .await,
            Err(StoreError::Unavailable { .. })
        ));

        // Other collections keep working.
        assert!(store.fetch(Collection::Attendance).await.is_ok());
    }

    #[tokio::test]
    async fn conditional_write_reports_stored_status() {
        let store = MemoryStore::new();
        store
            .put(Collection::SwapRequests, "s1", json!({"status": "pending"}))
            .await
            .unwrap();

        store
            .put_if_status(
                Collection::SwapRequests,
                "s1",
                "pending",
                json!({"status": "approved"}),
            )
            .await
            .unwrap();

        let err = store
            .put_if_status(
                Collection::SwapRequests,
                "s1",
                "pending",
                json!({"status": "rejected"}),
            )
            .await
            .unwrap_err();
        match err {
            StoreError::Conflict { current } => assert_eq!(current, "approved"),
            other => panic!("expected conflict, got {other}"),
        }

        let stored = store
            .get(Collection::SwapRequests, "s1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["status"], "approved");
    }

    #[tokio::test]
    async fn conditional_write_on_missing_record_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store
                .put_if_status(Collection::SwapRequests, "nope", "pending", json!({}))
                .await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn subscriptions_are_released_on_drop() {
        let store = MemoryStore::new();
        let first = store.subscribe(Collection::Roster).unwrap();
        let second = store.subscribe(Collection::Roster).unwrap();
        assert_eq!(store.subscriber_count(Collection::Roster), 2);

        drop(first);
        assert_eq!(store.subscriber_count(Collection::Roster), 1);

        second.release();
        assert_eq!(store.subscriber_count(Collection::Roster), 0);
    }
}
