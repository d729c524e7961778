//! Environment-driven configuration

use std::str::FromStr;
use std::time::Duration;

use tracing::level_filters::LevelFilter;

use crate::errors::ConfigError;
use crate::models::{EntityKey, EntityKind};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_WALLET_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_NODE_INTERVAL_MS: u64 = 200;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// How entity data is requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointMode {
    /// One `*_stats` request per refresh
    #[default]
    Consolidated,
    /// One request per field, issued concurrently
    PerEndpoint,
}

impl FromStr for EndpointMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "consolidated" => Ok(EndpointMode::Consolidated),
            "per_endpoint" | "per-endpoint" => Ok(EndpointMode::PerEndpoint),
            other => Err(ConfigError::InvalidValue {
                name: "ENDPOINT_MODE",
                value: other.to_string(),
                reason: "expected 'consolidated' or 'per_endpoint'".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub api_url: String,
    pub endpoint_mode: EndpointMode,
    pub wallet_interval: Duration,
    pub node_interval: Duration,
    pub request_timeout: Duration,
    pub wallets: Vec<String>,
    pub nodes: Vec<String>,
    /// Max level of the binary's log output
    pub log_level: LevelFilter,
    /// Log every row of each updated snapshot
    pub verbose_updates: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            endpoint_mode: EndpointMode::default(),
            wallet_interval: Duration::from_millis(DEFAULT_WALLET_INTERVAL_MS),
            node_interval: Duration::from_millis(DEFAULT_NODE_INTERVAL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            wallets: default_names("w"),
            nodes: default_names("n"),
            log_level: LevelFilter::INFO,
            verbose_updates: false,
        }
    }
}

impl SyncConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from any variable source; unset variables keep defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("DASHBOARD_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(mode) = lookup("ENDPOINT_MODE") {
            config.endpoint_mode = mode.parse()?;
        }
        if let Some(ms) = lookup("WALLET_POLL_INTERVAL_MS") {
            config.wallet_interval = parse_millis("WALLET_POLL_INTERVAL_MS", &ms)?;
        }
        if let Some(ms) = lookup("NODE_POLL_INTERVAL_MS") {
            config.node_interval = parse_millis("NODE_POLL_INTERVAL_MS", &ms)?;
        }
        if let Some(ms) = lookup("REQUEST_TIMEOUT_MS") {
            config.request_timeout = parse_millis("REQUEST_TIMEOUT_MS", &ms)?;
        }
        if let Some(list) = lookup("WALLETS") {
            config.wallets = parse_names(&list);
        }
        if let Some(list) = lookup("NODES") {
            config.nodes = parse_names(&list);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "LOG_LEVEL",
                value: level.clone(),
                reason: "expected off, error, warn, info, debug or trace".to_string(),
            })?;
        }
        if let Some(flag) = lookup("VERBOSE_UPDATES") {
            config.verbose_updates = parse_flag("VERBOSE_UPDATES", &flag)?;
        }

        Ok(config)
    }

    /// Every tracked key, wallets first
    pub fn entity_keys(&self) -> Vec<EntityKey> {
        self.wallets
            .iter()
            .map(EntityKey::wallet)
            .chain(self.nodes.iter().map(EntityKey::node))
            .collect()
    }

    /// Default polling cadence for an entity kind
    pub fn interval_for(&self, kind: EntityKind) -> Duration {
        match kind {
            EntityKind::Wallet => self.wallet_interval,
            EntityKind::Node => self.node_interval,
        }
    }
}

fn default_names(prefix: &str) -> Vec<String> {
    (1..=5).map(|i| format!("{}{}", prefix, i)).collect()
}

fn parse_names(list: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_millis(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        Ok(_) => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}
