//! Core traits for the sync engine

pub mod event_handler;
pub mod fetcher;

// Re-export for convenience
pub use event_handler::SyncEventHandler;
pub use fetcher::EntityFetcher;
