use async_trait::async_trait;

use crate::errors::SyncError;
use crate::models::{EntityKey, Snapshot};

/// Handler for poller events
#[async_trait]
pub trait SyncEventHandler: Send + Sync {
    /// A tick replaced the snapshot of `key`
    async fn handle_snapshot_update(&self, key: &EntityKey, snapshot: &Snapshot);

    /// A scheduled tick failed; the previous snapshot is kept
    async fn handle_error(&self, error: &SyncError);
}
