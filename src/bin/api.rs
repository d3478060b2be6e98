use cfo_copilot::{
    agent::Copilot, api::start_server, config::CopilotConfig, context::DataContext,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cfo_copilot=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CopilotConfig::from_env()?;

    info!("CFO Copilot - API Server");
    info!("Port: {}", config.port);
    info!("Data: {}", config.sources.actuals.display());

    let context = Arc::new(DataContext::from_sources(&config.sources, &config.columns)?);
    let copilot = Arc::new(Copilot::default());

    info!(tools = ?copilot.tool_names(), "Copilot initialized");

    start_server(copilot, context, config.port).await?;

    Ok(())
}
