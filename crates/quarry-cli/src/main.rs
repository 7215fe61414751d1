//! Quarry CLI - browse and open entries of remote Quarry catalogs.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quarry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List(args) => commands::list::run(&args).await,
        Commands::Describe(args) => commands::describe::run(&args).await,
        Commands::Search(args) => commands::search::run(&args).await,
        Commands::Open(args) => commands::open::run(&args).await,
        Commands::Len(args) => commands::len::run(&args).await,
        Commands::Version => {
            println!("quarry {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
