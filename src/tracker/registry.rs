//src/tracker/registry.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::models::{AddressEntry, EntityKey, EntityKind, Snapshot};
use crate::store::{EntityStore, Subscription};
use crate::traits::{EntityFetcher, SyncEventHandler};

use super::poller::{PollState, Poller, TickOutcome};

/// The fixed set of tracked entities and bulk operations over them
pub struct Registry {
    keys: Vec<EntityKey>,
    poller: Poller,
    wallet_interval: Duration,
    node_interval: Duration,
}

impl Registry {
    /// Create a registry over `keys`. Must be called inside a tokio runtime.
    pub fn new(
        keys: impl IntoIterator<Item = EntityKey>,
        fetcher: Arc<dyn EntityFetcher>,
        event_handler: Arc<dyn SyncEventHandler>,
    ) -> Self {
        let mut unique: Vec<EntityKey> = Vec::new();
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }

        let store = Arc::new(EntityStore::new(unique.iter().cloned()));
        let poller = Poller::new(unique.iter().cloned(), fetcher, store, event_handler);
        let defaults = SyncConfig::default();

        Self {
            keys: unique,
            poller,
            wallet_interval: defaults.wallet_interval,
            node_interval: defaults.node_interval,
        }
    }

    /// Create a registry tracking the keys and default intervals of `config`
    pub fn from_config(
        config: &SyncConfig,
        fetcher: Arc<dyn EntityFetcher>,
        event_handler: Arc<dyn SyncEventHandler>,
    ) -> Self {
        Self::new(config.entity_keys(), fetcher, event_handler)
            .with_default_intervals(config.wallet_interval, config.node_interval)
    }

    /// Override the per-kind intervals used by [`Registry::poll_all_default`]
    pub fn with_default_intervals(mut self, wallet: Duration, node: Duration) -> Self {
        self.wallet_interval = wallet;
        self.node_interval = node;
        self
    }

    pub fn keys(&self) -> &[EntityKey] {
        &self.keys
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        self.poller.store()
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Latest snapshot of `key`
    pub fn get(&self, key: &EntityKey) -> Arc<Snapshot> {
        self.store().get(key)
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&EntityKey, &Snapshot) + Send + Sync + 'static,
    {
        self.store().subscribe(callback)
    }

    pub fn start(&self, key: &EntityKey, interval: Duration) -> Result<(), SyncError> {
        self.poller.start(key, interval)
    }

    pub fn stop(&self, key: &EntityKey) -> Result<(), SyncError> {
        self.poller.stop(key)
    }

    pub async fn refresh_now(&self, key: &EntityKey) -> Result<TickOutcome, SyncError> {
        self.poller.refresh_now(key).await
    }

    /// Refresh every key once, concurrently, without starting schedules
    pub async fn init_all(&self) -> Result<(), SyncError> {
        let results = join_all(self.keys.iter().map(|key| self.poller.refresh_now(key))).await;

        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(_) => {}
                Err(SyncError::Fetch(e)) => failures.push(e),
                Err(other) => return Err(other),
            }
        }

        if failures.is_empty() {
            info!("Initialized {} entities", self.keys.len());
            Ok(())
        } else {
            warn!("{} of {} entities failed to initialize", failures.len(), self.keys.len());
            Err(SyncError::Refresh {
                failures,
                total: self.keys.len(),
            })
        }
    }

    /// Start polling every key at `interval`
    pub fn poll_all(&self, interval: Duration) -> Result<(), SyncError> {
        if interval.is_zero() {
            return Err(SyncError::ZeroInterval);
        }
        for key in &self.keys {
            self.poller.start(key, interval)?;
        }
        Ok(())
    }

    /// Start polling every key at its kind's default interval
    pub fn poll_all_default(&self) -> Result<(), SyncError> {
        if self.wallet_interval.is_zero() || self.node_interval.is_zero() {
            return Err(SyncError::ZeroInterval);
        }
        for key in &self.keys {
            let interval = match key.kind() {
                EntityKind::Wallet => self.wallet_interval,
                EntityKind::Node => self.node_interval,
            };
            self.poller.start(key, interval)?;
        }
        Ok(())
    }

    /// Stop every schedule
    pub fn stop_all(&self) {
        self.poller.stop_all();
        info!("Stopped polling {} entities", self.keys.len());
    }

    /// Keys currently being polled
    pub fn polling_keys(&self) -> Vec<EntityKey> {
        self.keys
            .iter()
            .filter(|key| matches!(self.poller.state(key), Ok(PollState::Polling)))
            .cloned()
            .collect()
    }

    /// Address list of every tracked wallet
    pub fn wallet_addresses(&self) -> HashMap<EntityKey, Vec<AddressEntry>> {
        self.keys
            .iter()
            .filter(|key| key.kind() == EntityKind::Wallet)
            .map(|key| {
                let addresses = self
                    .get(key)
                    .as_wallet()
                    .map(|wallet| wallet.addresses.clone())
                    .unwrap_or_default();
                (key.clone(), addresses)
            })
            .collect()
    }

    /// Log the current state of every entity
    pub fn log_overview(&self) {
        info!("{}", "=".repeat(80));
        info!("DASHBOARD OVERVIEW");
        info!("{}", "=".repeat(80));
        info!(
            "Timestamp: {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );

        for kind in [EntityKind::Wallet, EntityKind::Node] {
            info!("");
            info!("{}S:", kind.to_string().to_uppercase());
            info!("{}", "-".repeat(80));

            for key in self.keys.iter().filter(|key| key.kind() == kind) {
                let updated = self
                    .store()
                    .last_updated(key)
                    .map(|at| at.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "never".to_string());
                info!("{:>4}  {}  (updated {})", key.name(), self.get(key).summary(), updated);
            }
        }

        info!("{}", "=".repeat(80));
    }
}
