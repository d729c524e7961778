use std::fmt;

use serde::Serialize;

/// Kind of entity shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Wallet,
    Node,
}

impl EntityKind {
    /// Query parameter carrying the entity key
    pub fn query_param(&self) -> &'static str {
        match self {
            EntityKind::Wallet => "wallet",
            EntityKind::Node => "node",
        }
    }

    /// Per-endpoint paths, in the order the raw bundle is assembled
    pub fn endpoints(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Wallet => &[
                "balance",
                "available_balance",
                "addresses",
                "available_utxos",
                "history",
                "pending",
            ],
            EntityKind::Node => &["mempool", "node_utxos", "working_on"],
        }
    }

    /// Single endpoint returning every field at once
    pub fn consolidated_endpoint(&self) -> &'static str {
        match self {
            EntityKind::Wallet => "wallet_stats",
            EntityKind::Node => "node_stats",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_param())
    }
}

/// Identifier of a tracked wallet or node (`w1`, `n3`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityKey {
    kind: EntityKind,
    name: String,
}

impl EntityKey {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn wallet(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Wallet, name)
    }

    pub fn node(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Node, name)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Value sent to the backend as the query parameter
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
