use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tracing::info;

use crate::config::AppConfig;
use crate::database::ResourceStore;
use crate::server;

#[derive(Parser)]
#[command(name = "resource-api")]
#[command(about = "JSON resource service with etags and delegated permissions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Serve the resource API (default)")]
    Serve {
        #[arg(long, short, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Create the resource table and index, then exit")]
    InitDb,
}

pub async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.service.port = port;
            }
            let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));
            let state = server::build_state(config).await?;
            server::serve(state, addr).await
        }
        Commands::InitDb => {
            let store = server::build_store(&config).await?;
            store.init().await?;
            info!("Storage for {} initialised", config.service.collection_path());
            Ok(())
        }
    }
}
