//! # Autotyper
//!
//! Entry point: initializes logging, loads configuration and serves the
//! HTTP control API.

use anyhow::Result;
use tracing::info;

use autotyper::config::Settings;
use autotyper::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    autotyper::telemetry::init_tracing();

    info!("Starting Autotyper...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        gateway_url = %settings.platform.gateway_url,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
