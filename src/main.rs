use clap::Parser;
use tracing_subscriber::EnvFilter;

use resource_api::cli::{self, Cli};
use resource_api::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, COMPONENT, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {}", info);
    }));

    let cli = Cli::parse();

    // First access reads the environment
    let config = config::config().clone();
    if let Err(msg) = config.validate() {
        tracing::error!("Invalid configuration: {}", msg);
        std::process::exit(2);
    }
    tracing::info!(
        "Starting {} in {:?} mode (collection {})",
        config.service.component,
        config.environment,
        config.service.collection_path()
    );

    if let Err(e) = cli::run(cli, config).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => tracing::error!("{:?}", e),
            _ => tracing::error!("{}", e),
        }
        std::process::exit(1);
    }

    Ok(())
}
