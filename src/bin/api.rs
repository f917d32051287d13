use competitive_intel_advisor::{agent::Advisor, api::start_server, config::AdvisorConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AdvisorConfig::from_env()?;

    info!("Competitive Intelligence Advisor - API Server");
    info!("Port: {}", config.port);

    let advisor = Arc::new(Advisor::from_config(&config)?);

    info!("Starting API server...");
    start_server(advisor, config.port).await?;

    Ok(())
}
