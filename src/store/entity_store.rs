use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::errors::SyncError;
use crate::models::{EntityKey, Snapshot};

/// Observer invoked after every successful replacement
pub type SnapshotCallback = Arc<dyn Fn(&EntityKey, &Snapshot) + Send + Sync>;

type Subscribers = DashMap<u64, SnapshotCallback>;

#[derive(Clone)]
struct StoredSnapshot {
    snapshot: Arc<Snapshot>,
    updated_at: Option<DateTime<Utc>>,
}

/// Holds the latest snapshot of every tracked entity.
///
/// Snapshots are stored behind `Arc` and swapped whole, so a reader either
/// sees the previous value or the new one, never a mix.
pub struct EntityStore {
    snapshots: DashMap<EntityKey, StoredSnapshot>,
    subscribers: Arc<Subscribers>,
    next_subscriber: AtomicU64,
}

impl EntityStore {
    /// Create a store tracking exactly `keys`, each with its own empty snapshot
    pub fn new(keys: impl IntoIterator<Item = EntityKey>) -> Self {
        let snapshots = DashMap::new();
        for key in keys {
            let empty = Arc::new(Snapshot::empty(key.kind()));
            snapshots.insert(
                key,
                StoredSnapshot {
                    snapshot: empty,
                    updated_at: None,
                },
            );
        }

        Self {
            snapshots,
            subscribers: Arc::new(DashMap::new()),
            next_subscriber: AtomicU64::new(0),
        }
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.snapshots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Latest snapshot of `key`, or an empty one if it was never set
    pub fn get(&self, key: &EntityKey) -> Arc<Snapshot> {
        self.snapshots
            .get(key)
            .map(|entry| entry.snapshot.clone())
            .unwrap_or_else(|| Arc::new(Snapshot::empty(key.kind())))
    }

    /// When `key` was last replaced
    pub fn last_updated(&self, key: &EntityKey) -> Option<DateTime<Utc>> {
        self.snapshots.get(key).and_then(|entry| entry.updated_at)
    }

    /// Replace the snapshot of `key` and notify subscribers
    pub fn set(&self, key: &EntityKey, snapshot: Snapshot) -> Result<(), SyncError> {
        let snapshot = Arc::new(snapshot);
        self.replace(key, snapshot.clone())?;
        self.notify(key, &snapshot);
        Ok(())
    }

    /// Swap in a new snapshot without notifying anyone
    pub(crate) fn replace(&self, key: &EntityKey, snapshot: Arc<Snapshot>) -> Result<(), SyncError> {
        match self.snapshots.get_mut(key) {
            Some(mut entry) => {
                *entry = StoredSnapshot {
                    snapshot,
                    updated_at: Some(Utc::now()),
                };
                Ok(())
            }
            None => {
                warn!("Refusing to store snapshot for untracked entity {}", key);
                Err(SyncError::UnknownEntity(key.clone()))
            }
        }
    }

    /// Call every subscriber with the new snapshot of `key`
    pub(crate) fn notify(&self, key: &EntityKey, snapshot: &Snapshot) {
        // Collect first so a callback may unsubscribe without deadlocking
        let callbacks: Vec<SnapshotCallback> = self
            .subscribers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for callback in callbacks {
            callback(key, snapshot);
        }
    }

    /// Register an observer called once per successful `set`
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&EntityKey, &Snapshot) + Send + Sync + 'static,
    {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, Arc::new(callback));
        debug!("Subscriber {} registered", id);

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Handle returned by [`EntityStore::subscribe`].
///
/// Dropping it keeps the callback registered; call [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.remove(&self.id);
        }
    }
}
