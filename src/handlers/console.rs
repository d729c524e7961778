use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::SyncError;
use crate::models::{EntityKey, Snapshot};
use crate::traits::event_handler::SyncEventHandler;

/// Console logging event handler
pub struct ConsoleEventHandler {
    verbose: bool,
}

impl ConsoleEventHandler {
    /// Create a handler logging one line per update
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Also log every row of each updated snapshot
    pub fn verbose() -> Self {
        Self { verbose: true }
    }

    fn log_rows(&self, snapshot: &Snapshot) {
        match snapshot {
            Snapshot::Wallet(wallet) => {
                for utxo in &wallet.available_utxos {
                    info!("     UTXO {}: {}", utxo.address, utxo.balance);
                }
                for row in &wallet.history {
                    let block = row.block.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string());
                    info!("     [{}] {} {} {}", block, row.kind, row.txid, row.amount);
                }
            }
            Snapshot::Node(node) => {
                for tx in &node.mempool {
                    info!("     mempool {}", tx.txid);
                }
                for utxo in &node.utxos {
                    info!("     UTXO {}: {}", utxo.address, utxo.balance);
                }
            }
        }
    }
}

impl Default for ConsoleEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncEventHandler for ConsoleEventHandler {
    async fn handle_snapshot_update(&self, key: &EntityKey, snapshot: &Snapshot) {
        info!("{} {} updated: {}", key.kind(), key, snapshot.summary());

        if self.verbose {
            self.log_rows(snapshot);
        }
    }

    async fn handle_error(&self, error: &SyncError) {
        warn!("Refresh failed, keeping previous snapshot: {}", error);
    }
}
