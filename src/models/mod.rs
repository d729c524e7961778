//! Data models for the dashboard sync engine

pub mod entity;
pub mod raw;
pub mod snapshot;

// Re-export for convenience
pub use entity::{EntityKey, EntityKind};
pub use raw::{RawBundle, RawEndpointResult, RawNodeStats, RawWalletStats};
pub use snapshot::{
    AddressEntry, HistoryEntry, MempoolEntry, NodeSnapshot, Scalar, Snapshot, UtxoEntry,
    WalletSnapshot,
};
