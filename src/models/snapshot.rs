use serde::{Deserialize, Serialize};

use super::entity::EntityKind;

/// Scalar value reported by the pending endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Address owned by a wallet and whatever metadata the backend attached to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressEntry {
    pub address: String,
    pub metadata: serde_json::Value,
}

/// Balance held by one address, formatted with two decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtxoEntry {
    pub address: String,
    pub balance: String,
}

/// One row of wallet transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// `None` while the transaction is unconfirmed
    pub block: Option<u64>,
    pub kind: String,
    /// Display form, truncated
    pub txid: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MempoolEntry {
    pub txid: String,
}

/// Display-ready state of a wallet
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WalletSnapshot {
    pub total_balance: f64,
    pub available_balance: f64,
    pub addresses: Vec<AddressEntry>,
    pub available_utxos: Vec<UtxoEntry>,
    pub history: Vec<HistoryEntry>,
    pub next_pending: Option<Scalar>,
}

/// Display-ready state of a node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NodeSnapshot {
    pub current_height: u64,
    pub mempool: Vec<MempoolEntry>,
    pub utxos: Vec<UtxoEntry>,
}

/// Complete state of one entity. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Snapshot {
    Wallet(WalletSnapshot),
    Node(NodeSnapshot),
}

impl Snapshot {
    /// Fresh, independently owned empty snapshot for an entity kind
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Wallet => Snapshot::Wallet(WalletSnapshot::default()),
            EntityKind::Node => Snapshot::Node(NodeSnapshot::default()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Snapshot::Wallet(_) => EntityKind::Wallet,
            Snapshot::Node(_) => EntityKind::Node,
        }
    }

    pub fn as_wallet(&self) -> Option<&WalletSnapshot> {
        match self {
            Snapshot::Wallet(wallet) => Some(wallet),
            Snapshot::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&NodeSnapshot> {
        match self {
            Snapshot::Node(node) => Some(node),
            Snapshot::Wallet(_) => None,
        }
    }

    /// One-line summary used in logs
    pub fn summary(&self) -> String {
        match self {
            Snapshot::Wallet(w) => format!(
                "balance {:.2} (available {:.2}), {} addresses, {} utxos, {} history rows",
                w.total_balance,
                w.available_balance,
                w.addresses.len(),
                w.available_utxos.len(),
                w.history.len()
            ),
            Snapshot::Node(n) => format!(
                "height {}, {} mempool txs, {} utxos",
                n.current_height,
                n.mempool.len(),
                n.utxos.len()
            ),
        }
    }
}
