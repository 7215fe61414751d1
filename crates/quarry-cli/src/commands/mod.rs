//! CLI commands and argument parsing.

pub mod connection;
pub mod describe;
pub mod len;
pub mod list;
pub mod open;
pub mod search;

use clap::{Parser, Subcommand};

/// Quarry - browse remote data catalogs
#[derive(Parser)]
#[command(name = "quarry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List catalog entries
    List(list::ListArgs),

    /// Describe one entry
    Describe(describe::DescribeArgs),

    /// Search the catalog on the server
    Search(search::SearchArgs),

    /// Open an entry and show how it resolves
    Open(open::OpenArgs),

    /// Print the number of entries
    Len(len::LenArgs),

    /// Print version information
    Version,
}

/// Parses a `KEY=VALUE` argument.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

/// Interprets a command-line value as JSON, falling back to a plain string.
pub fn json_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
