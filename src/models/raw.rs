use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::entity::EntityKind;
use super::snapshot::Scalar;

/// Amount sent either as a number or as a formatted string such as `"3.00"`
fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(value) => Ok(value),
        Amount::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// `[address, amount]` or `{address, balance}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawUtxo {
    Pair(String, f64),
    Record {
        address: String,
        #[serde(alias = "amount", deserialize_with = "amount")]
        balance: f64,
    },
}

impl RawUtxo {
    pub fn address(&self) -> &str {
        match self {
            RawUtxo::Pair(address, _) | RawUtxo::Record { address, .. } => address,
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            RawUtxo::Pair(_, amount) => *amount,
            RawUtxo::Record { balance, .. } => *balance,
        }
    }
}

/// `[block, type, txid, amount]` or `{block, kind, txid, amount}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawHistoryRow {
    Row(Option<u64>, String, String, f64),
    Record {
        #[serde(default)]
        block: Option<u64>,
        #[serde(alias = "type")]
        kind: String,
        txid: String,
        #[serde(deserialize_with = "amount")]
        amount: f64,
    },
}

impl RawHistoryRow {
    pub fn block(&self) -> Option<u64> {
        match self {
            RawHistoryRow::Row(block, ..) | RawHistoryRow::Record { block, .. } => *block,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            RawHistoryRow::Row(_, kind, ..) | RawHistoryRow::Record { kind, .. } => kind,
        }
    }

    pub fn txid(&self) -> &str {
        match self {
            RawHistoryRow::Row(_, _, txid, _) | RawHistoryRow::Record { txid, .. } => txid,
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            RawHistoryRow::Row(.., amount) | RawHistoryRow::Record { amount, .. } => *amount,
        }
    }
}

/// Bare txid or `{txid}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawMempoolEntry {
    Txid(String),
    Record { txid: String },
}

impl RawMempoolEntry {
    pub fn txid(&self) -> &str {
        match self {
            RawMempoolEntry::Txid(txid) | RawMempoolEntry::Record { txid } => txid,
        }
    }
}

/// `{address, metadata}` or a map of address -> metadata
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAddress {
    Record { address: String, metadata: Value },
    Keyed(Map<String, Value>),
}

impl RawAddress {
    pub fn entries(&self) -> Vec<(&str, &Value)> {
        match self {
            RawAddress::Record { address, metadata } => vec![(address.as_str(), metadata)],
            RawAddress::Keyed(map) => map.iter().map(|(address, metadata)| (address.as_str(), metadata)).collect(),
        }
    }
}

/// Unmodified JSON body of one endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct RawEndpointResult {
    pub endpoint: &'static str,
    pub payload: Value,
}

/// Wallet fields as the backend sends them
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RawWalletStats {
    #[serde(alias = "total_balance")]
    pub balance: f64,
    pub available_balance: f64,
    #[serde(default)]
    pub addresses: Vec<RawAddress>,
    #[serde(default)]
    pub available_utxos: Vec<RawUtxo>,
    #[serde(default)]
    pub history: Vec<RawHistoryRow>,
    #[serde(default, alias = "next_pending")]
    pub pending: Option<Scalar>,
}

/// Node fields as the backend sends them
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RawNodeStats {
    #[serde(default)]
    pub mempool: Vec<RawMempoolEntry>,
    #[serde(default, alias = "node_utxos")]
    pub utxos: Vec<RawUtxo>,
    #[serde(alias = "current", alias = "current_height")]
    pub working_on: u64,
}

/// Result of one complete fetch, shape-checked but not yet transformed
#[derive(Debug, Clone, PartialEq)]
pub enum RawBundle {
    Wallet(RawWalletStats),
    Node(RawNodeStats),
}

impl RawBundle {
    pub fn kind(&self) -> EntityKind {
        match self {
            RawBundle::Wallet(_) => EntityKind::Wallet,
            RawBundle::Node(_) => EntityKind::Node,
        }
    }

    /// Decode the body of a consolidated `*_stats` endpoint
    pub fn from_consolidated(kind: EntityKind, payload: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            EntityKind::Wallet => RawBundle::Wallet(serde_json::from_value(payload)?),
            EntityKind::Node => RawBundle::Node(serde_json::from_value(payload)?),
        })
    }

    /// Assemble a bundle from one result per endpoint
    pub fn from_endpoint_results(
        kind: EntityKind,
        results: Vec<RawEndpointResult>,
    ) -> serde_json::Result<Self> {
        let fields: Map<String, Value> = results
            .into_iter()
            .map(|result| (result.endpoint.to_string(), result.payload))
            .collect();
        Self::from_consolidated(kind, Value::Object(fields))
    }
}
