//! Describe command implementation.

use anyhow::{Context, Result};
use clap::Args;

use super::connection::ConnectionArgs;

/// Arguments for the describe command.
#[derive(Args)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Entry name
    pub name: String,
}

/// Runs the describe command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or has no such entry.
pub async fn run(args: &DescribeArgs) -> Result<()> {
    let mut catalog = args.connection.connect().await?;
    let entry = catalog
        .get(&args.name)
        .await
        .with_context(|| format!("Failed to look up entry '{}'", args.name))?;

    println!("{}", serde_json::to_string_pretty(&entry.describe())?);
    Ok(())
}
