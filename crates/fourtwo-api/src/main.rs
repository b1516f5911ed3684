//! Binary entrypoint for the FourTwo simulation API.
use anyhow::Context;
use fourtwo_api::{config::ApiConfig, run};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    run(&config).await.context("simulation API stopped")?;
    Ok(())
}
