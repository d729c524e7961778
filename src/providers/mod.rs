//! Fetchers pulling entity data from the backend

pub mod http_fetcher;

// Re-export for convenience
pub use http_fetcher::HttpFetcher;
