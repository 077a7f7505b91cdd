//! katyusha - HTTP benchmarking tool with a persistent inventory

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    commands::dispatch(cli).await
}
