//! Error types of the sync engine

use crate::models::EntityKey;

/// Why a single fetch failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchErrorKind {
    #[error("network error: {0}")]
    Network(String),

    #[error("backend answered with status {0}")]
    HttpStatus(u16),

    #[error("unexpected response shape: {0}")]
    Decode(String),
}

/// A failed refresh of one entity. No partial data is ever returned with it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fetch for {entity_key} failed ({}): {kind}", .endpoint.as_deref().unwrap_or("bundle"))]
pub struct FetchError {
    pub entity_key: EntityKey,
    /// Endpoint that failed, when a single one can be blamed
    pub endpoint: Option<String>,
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(entity_key: &EntityKey, endpoint: Option<&str>, kind: FetchErrorKind) -> Self {
        Self {
            entity_key: entity_key.clone(),
            endpoint: endpoint.map(str::to_string),
            kind,
        }
    }

    /// Map a transport error from reqwest onto the fetch taxonomy
    pub fn from_reqwest(entity_key: &EntityKey, endpoint: &str, err: reqwest::Error) -> Self {
        let kind = if let Some(status) = err.status() {
            FetchErrorKind::HttpStatus(status.as_u16())
        } else if err.is_decode() {
            FetchErrorKind::Decode(err.to_string())
        } else {
            FetchErrorKind::Network(err.to_string())
        };
        Self::new(entity_key, Some(endpoint), kind)
    }
}

/// Errors surfaced by the poller and the registry
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("entity '{0}' is not tracked by this registry")]
    UnknownEntity(EntityKey),

    #[error("polling interval must be greater than zero")]
    ZeroInterval,

    #[error("{} of {total} refreshes failed", .failures.len())]
    Refresh { failures: Vec<FetchError>, total: usize },
}

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}
