//! Alert Relay - Main Entry Point

use anyhow::Context;
use api::{run_server, telemetry::init_logging, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_logging(&config.log)?;

    info!("=== Alert Relay v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        window_secs = config.debounce.window_seconds,
        max_pending = config.debounce.max_pending_entries,
        "Debounce settings loaded"
    );

    run_server(config).await.context("alert relay failed")?;

    Ok(())
}
