//! Search command implementation.
//!
//! Runs a query on the server and lists the entries of the scoped catalog it
//! returns.

use anyhow::{Context, Result};
use clap::Args;
use quarry_remote::SearchQuery;
use tracing::info;

use super::connection::ConnectionArgs;
use super::{json_value, parse_key_value};

/// Arguments for the search command.
#[derive(Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Positional query terms
    pub terms: Vec<String>,

    /// Keyword query argument, as KEY=VALUE (repeatable)
    #[arg(short, long = "kwarg", value_parser = parse_key_value)]
    pub kwargs: Vec<(String, String)>,

    /// Stop after this many results
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

impl SearchArgs {
    fn query(&self) -> SearchQuery {
        let mut query = SearchQuery::default();
        for term in &self.terms {
            query = query.with_arg(term.as_str());
        }
        for (key, value) in &self.kwargs {
            query = query.with_kwarg(key, json_value(value));
        }
        query
    }
}

/// Runs the search command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the search fails.
pub async fn run(args: &SearchArgs) -> Result<()> {
    let catalog = args.connection.connect().await?;
    let query = args.query();
    info!(terms = ?query.args, kwargs = ?query.kwargs, "Searching catalog");

    let mut results = catalog.search(&query).await.context("Search failed")?;
    if let Some(scope) = results.source_id() {
        info!(source_id = %scope, "Search scope");
    }

    let mut entries = results.entries().await?;
    let mut shown = 0;
    while args.limit.map_or(true, |limit| shown < limit) {
        let Some(item) = entries.next_entry().await else {
            break;
        };
        let (name, _) = item.context("Failed to list search results")?;
        println!("{name}");
        shown += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        search: SearchArgs,
    }

    #[test]
    fn test_query_from_args() {
        let wrapper = Wrapper::try_parse_from([
            "search",
            "--url",
            "quarry://localhost:5000",
            "rain",
            "--kwarg",
            "temp=>0",
            "--kwarg",
            "depth=2",
        ])
        .unwrap();

        let query = wrapper.search.query();

        assert_eq!(query.args, vec![json!("rain")]);
        assert_eq!(query.kwargs["temp"], ">0");
        assert_eq!(query.kwargs["depth"], 2);
    }
}
