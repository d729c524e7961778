//! Latest snapshot per tracked entity

pub mod entity_store;

// Re-export for convenience
pub use entity_store::{EntityStore, SnapshotCallback, Subscription};
