//! Dashboard Sync Library
//!
//! Keeps display-ready snapshots of wallets and nodes up to date by polling
//! a dashboard backend, one independent schedule per tracked entity.

// Public modules - these are the API surface
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod providers;
pub mod store;
pub mod tracker;
pub mod traits;
pub mod transform;
pub mod utils;

// Re-export commonly used items for easier access
pub use config::{EndpointMode, SyncConfig};
pub use errors::{ConfigError, FetchError, FetchErrorKind, SyncError};
pub use handlers::console::ConsoleEventHandler;
pub use models::{
    entity::{EntityKey, EntityKind},
    raw::{RawAddress, RawBundle, RawEndpointResult, RawHistoryRow, RawMempoolEntry, RawUtxo},
    snapshot::{NodeSnapshot, Snapshot, WalletSnapshot},
};
pub use providers::http_fetcher::HttpFetcher;
pub use store::entity_store::{EntityStore, Subscription};
pub use tracker::{
    poller::{PollState, Poller, TickOutcome},
    registry::Registry,
};
pub use traits::{event_handler::SyncEventHandler, fetcher::EntityFetcher};
pub use transform::transform;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias for application-level functions
pub type Result<T> = std::result::Result<T, anyhow::Error>;
