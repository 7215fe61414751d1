//! Open command implementation.
//!
//! Opens an entry on the server and reports whether it resolved to a source
//! the client can read directly or one proxied through the server.

use anyhow::{Context, Result};
use clap::Args;
use quarry_remote::{PluginRegistry, ResolvedSource};
use serde_json::{json, Map, Value};
use tracing::info;

use super::connection::ConnectionArgs;
use super::{json_value, parse_key_value};

/// Arguments for the open command.
#[derive(Args)]
pub struct OpenArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Entry name
    pub name: String,

    /// User parameter, as KEY=VALUE (repeatable)
    #[arg(short, long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Plugin available locally (repeatable)
    #[arg(long = "plugin")]
    pub plugins: Vec<String>,
}

impl OpenArgs {
    fn parameters(&self) -> Map<String, Value> {
        self.params
            .iter()
            .map(|(key, value)| (key.clone(), json_value(value)))
            .collect()
    }
}

/// Runs the open command.
///
/// # Errors
///
/// Returns an error if the entry cannot be found or the server refuses to
/// open it.
pub async fn run(args: &OpenArgs) -> Result<()> {
    let mut catalog = args.connection.connect().await?;
    let entry = catalog
        .get(&args.name)
        .await
        .with_context(|| format!("Failed to look up entry '{}'", args.name))?;

    let plugins: PluginRegistry = args.plugins.iter().map(String::as_str).collect();
    info!(name = %args.name, plugins = ?args.plugins, "Opening entry");

    let mut parameters = args.parameters();
    for declared in &entry.record().user_parameters {
        if let Some(value) = parameters.remove(&declared.name) {
            let value = declared
                .validate(value)
                .with_context(|| format!("Invalid value for parameter '{}'", declared.name))?;
            parameters.insert(declared.name.clone(), value);
        }
    }

    let resolved = entry
        .get(parameters, &plugins)
        .await
        .with_context(|| format!("Failed to open entry '{}'", args.name))?;

    println!("{}", serde_json::to_string_pretty(&summary(&resolved))?);
    Ok(())
}

fn summary(resolved: &ResolvedSource) -> Value {
    match resolved {
        ResolvedSource::Direct(source) => json!({
            "access": "direct",
            "name": source.name,
            "plugin": source.plugin,
            "args": source.args,
        }),
        ResolvedSource::Proxy(source) => json!({
            "access": "proxy",
            "name": source.name,
            "container": source.container,
            "source_id": source.source_id(),
            "fields": source.fields,
        }),
    }
}
