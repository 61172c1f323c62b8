mod chat_id;
mod cli;
mod config;
mod errors;
mod gateway;
mod ingest;
mod leads;
mod media;
mod message;
mod phone;
mod storage;
mod utils;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".parse().unwrap());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    cli::run().await
}
