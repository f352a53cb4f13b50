use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use zendocs::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::info!("zendocs startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("zendocs finished"),
        Err(e) => tracing::error!(error = %e, "zendocs exited with error"),
    }
    result
}
