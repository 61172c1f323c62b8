use crate::config::{self, Config};
use crate::gateway;
use crate::ingest::IngestPipeline;
use crate::leads::LeadStore;
use crate::media::MediaIngestor;
use crate::storage::FsBucketStorage;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "leadcrab", version, about = "WhatsApp lead-ingest engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the inbound webhook endpoint
    Serve {
        /// Config file path (default: ~/.leadcrab/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate configuration and open the lead store
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config, port } => {
            let mut cfg = config::load_config(config.as_deref())?;
            if let Some(port) = port {
                cfg.server.port = port;
            }
            let pipeline = build_pipeline(&cfg)?;
            gateway::serve(&cfg.server, pipeline).await
        }
        Command::Check { config } => {
            let cfg = config::load_config(config.as_deref())?;
            println!("config OK");
            let store = LeadStore::new(cfg.database.resolved_path()?)?;
            println!("lead store OK ({} leads)", store.count()?);
            match &cfg.gateway.base_url {
                Some(url) => println!("gateway: {}", url),
                None => {
                    println!("gateway: not configured (loopback media URLs will not be rewritten)");
                }
            }
            Ok(())
        }
    }
}

fn build_pipeline(cfg: &Config) -> Result<Arc<IngestPipeline>> {
    let store = Arc::new(LeadStore::new(cfg.database.resolved_path()?)?);
    let storage = Arc::new(FsBucketStorage::new(
        cfg.storage.bucket.clone(),
        cfg.storage.resolved_root()?,
    ));
    let media = MediaIngestor::new(storage, Some(cfg.gateway.clone()));
    Ok(Arc::new(IngestPipeline::new(store, media)))
}
