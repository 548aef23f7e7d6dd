mod cli;
mod commands;
mod content_store;
mod lifecycle;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve => lifecycle::serve(&cli.data_dir).await,
        Command::Upload { file, license } => commands::upload(&cli.data_dir, &cli.key_dir, &file, &license).await,
        Command::Purchase { asset } => commands::purchase(&cli.data_dir, &cli.key_dir, &asset).await,
        Command::Access { asset } => commands::access(&cli.data_dir, &cli.key_dir, &asset).await,
        Command::ListAssets => commands::list_assets(&cli.data_dir).await,
        Command::MyAssets => commands::my_assets(&cli.data_dir, &cli.key_dir).await,
        Command::Blockchain { verbose } => commands::blockchain(&cli.data_dir, verbose).await,
    };

    if let Err(ref e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
    result
}
