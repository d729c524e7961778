use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use dashboard_sync::{ConsoleEventHandler, HttpFetcher, Registry, SyncConfig};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = SyncConfig::from_env().context("invalid configuration")?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_level(true)
        .with_target(false)
        .with_max_level(config.log_level)
        .with_file(true)
        .with_line_number(true)
        .init();

    tokio::runtime::Runtime::new()?.block_on(async {
        info!("Initializing dashboard sync v{}...", dashboard_sync::VERSION);
        info!("Backend URL: {}", config.api_url);
        info!("Endpoint mode: {:?}", config.endpoint_mode);
        info!("Wallets: {}", config.wallets.join(", "));
        info!("Nodes: {}", config.nodes.join(", "));

        let fetcher = HttpFetcher::from_config(&config).context("failed to build HTTP client")?;
        let handler = if config.verbose_updates {
            ConsoleEventHandler::verbose()
        } else {
            ConsoleEventHandler::new()
        };

        let registry = Registry::from_config(&config, Arc::new(fetcher), Arc::new(handler));

        // Initial load; failures are not fatal, polling keeps retrying
        if let Err(e) = registry.init_all().await {
            warn!("Initial refresh incomplete: {}", e);
        }
        registry.log_overview();

        if let Err(e) = registry.poll_all_default() {
            error!("Failed to start polling: {}", e);
            return Err(e.into());
        }

        info!("Dashboard sync is running. Press Ctrl+C to stop.");

        tokio::signal::ctrl_c().await?;

        info!("Shutting down...");
        registry.stop_all();
        registry.log_overview();

        Ok(())
    })
}
