//! List command implementation.
//!
//! Walks the catalog page by page and prints one line per entry.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::connection::ConnectionArgs;

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Stop after this many entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Show container and description
    #[arg(short, long)]
    pub long: bool,
}

/// Runs the list command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or a page cannot be
/// fetched.
pub async fn run(args: &ListArgs) -> Result<()> {
    info!(url = %args.connection.url, limit = ?args.limit, "Listing catalog");

    let mut catalog = args.connection.connect().await?;
    let mut entries = catalog.entries().await?;

    let mut shown = 0;
    while args.limit.map_or(true, |limit| shown < limit) {
        let Some(item) = entries.next_entry().await else {
            break;
        };
        let (name, entry) = item.context("Failed to list entries")?;
        if args.long {
            println!("{name:<32} {:<12} {}", entry.container(), entry.description());
        } else {
            println!("{name}");
        }
        shown += 1;
    }

    Ok(())
}
