//! Len command implementation.

use anyhow::{Context, Result};
use clap::Args;

use super::connection::ConnectionArgs;

/// Arguments for the len command.
#[derive(Args)]
pub struct LenArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Runs the len command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or counted.
pub async fn run(args: &LenArgs) -> Result<()> {
    let mut catalog = args.connection.connect().await?;
    let len = catalog.len().await.context("Failed to count entries")?;
    println!("{len}");
    Ok(())
}
