// src/notifications/mod.rs
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{error, warn};

use crate::errors::SyncError;
use crate::models::{EntityKey, Snapshot};
use crate::traits::event_handler::SyncEventHandler;

/// Notification types
#[derive(Debug, Clone)]
pub enum Notification {
    SnapshotUpdated(EntityKey, Arc<Snapshot>),
    Error(SyncError),
    Shutdown,
}

/// Notification queue decoupling handlers from the polling path
#[derive(Clone)]
pub struct NotificationQueue {
    sender: UnboundedSender<Notification>,
}

impl NotificationQueue {
    /// Create a new notification queue. Must be called inside a tokio runtime.
    pub fn new(handler: Arc<dyn SyncEventHandler>) -> Self {
        let (sender, receiver) = unbounded_channel();

        // Spawn a dedicated task for processing notifications
        tokio::spawn(Self::process_notifications(receiver, handler));

        Self { sender }
    }

    async fn process_notifications(
        mut receiver: UnboundedReceiver<Notification>,
        handler: Arc<dyn SyncEventHandler>,
    ) {
        while let Some(notification) = receiver.recv().await {
            match notification {
                Notification::SnapshotUpdated(key, snapshot) => {
                    handler.handle_snapshot_update(&key, &snapshot).await;
                }
                Notification::Error(err) => {
                    handler.handle_error(&err).await;
                }
                Notification::Shutdown => {
                    warn!("Notification processor shutting down");
                    break;
                }
            }
        }
    }

    /// Queue a snapshot update notification (non-blocking)
    pub fn notify_snapshot_update(&self, key: &EntityKey, snapshot: Arc<Snapshot>) {
        self.send(Notification::SnapshotUpdated(key.clone(), snapshot));
    }

    /// Queue an error notification (non-blocking)
    pub fn notify_error(&self, error: SyncError) {
        self.send(Notification::Error(error));
    }

    /// Stop the processing task after already queued notifications
    pub fn shutdown(&self) {
        self.send(Notification::Shutdown);
    }

    fn send(&self, notification: Notification) {
        if let Err(e) = self.sender.send(notification) {
            error!("Failed to queue notification: {}", e);
        }
    }
}
