//! Connection options shared by every command.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use quarry_core::PersistMode;
use quarry_remote::{CatalogConfig, RemoteCatalog, StaticAuth, TlsConfig};

use super::parse_key_value;

/// Arguments for connecting to a catalog server.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Catalog server URL (e.g., `quarry://localhost:5000`)
    #[arg(short, long, env = "QUARRY_URL")]
    pub url: String,

    /// Use https for `quarry://` URLs
    #[arg(long)]
    pub ssl: bool,

    /// Bearer token for authentication
    #[arg(long, env = "QUARRY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Username for basic authentication
    #[arg(long, env = "QUARRY_USERNAME")]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "QUARRY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Extra request header, as KEY=VALUE (repeatable)
    #[arg(long = "header", value_parser = parse_key_value)]
    pub headers: Vec<(String, String)>,

    /// Entries fetched per request; 0 fetches everything at once
    #[arg(long, env = "QUARRY_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Do not expand client_env(..) in parameter defaults
    #[arg(long)]
    pub no_getenv: bool,

    /// Do not run client_shell(..) in parameter defaults
    #[arg(long)]
    pub no_getshell: bool,

    /// Persistence preference passed on to opened entries
    #[arg(long, value_parser = parse_persist_mode, default_value = "default")]
    pub persist: PersistMode,

    /// CA certificate (PEM) to trust
    #[arg(long)]
    pub ca_cert: Option<std::path::PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

impl ConnectionArgs {
    /// Builds the catalog configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the authentication options are incomplete.
    pub fn config(&self) -> Result<CatalogConfig> {
        let mut config = CatalogConfig::new(&self.url)
            .with_ssl(self.ssl)
            .with_expansion(!self.no_getenv, !self.no_getshell)
            .with_persist_mode(self.persist)
            .with_timeout(Duration::from_secs(self.timeout));

        if let Some(page_size) = self.page_size {
            config = config.with_page_size(page_size);
        }
        for (name, value) in &self.headers {
            config = config.with_header(name, value);
        }

        if self.ca_cert.is_some() || self.insecure {
            let mut tls = TlsConfig::new();
            if let Some(ref path) = self.ca_cert {
                tls = tls.with_ca_cert(path);
            }
            if self.insecure {
                tls = tls.insecure();
            }
            config = config.with_tls(tls);
        }

        if let Some(auth) = determine_auth(self)? {
            config = config.with_auth(auth);
        }
        Ok(config)
    }

    /// Connects to the server and loads the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the catalog cannot
    /// be loaded.
    pub async fn connect(&self) -> Result<RemoteCatalog> {
        let config = self.config()?;
        RemoteCatalog::connect(config)
            .await
            .with_context(|| format!("Failed to load catalog at {}", self.url))
    }
}

/// Determines the authentication method from CLI arguments.
fn determine_auth(args: &ConnectionArgs) -> Result<Option<StaticAuth>> {
    if let Some(ref token) = args.token {
        return Ok(Some(StaticAuth::bearer(token)));
    }

    if let (Some(ref username), Some(ref password)) = (&args.username, &args.password) {
        return Ok(Some(StaticAuth::basic(username, password)));
    }

    if args.username.is_some() || args.password.is_some() {
        anyhow::bail!("Both --username and --password are required for basic authentication");
    }

    Ok(None)
}

fn parse_persist_mode(s: &str) -> Result<PersistMode, String> {
    match s {
        "default" => Ok(PersistMode::Default),
        "always" => Ok(PersistMode::Always),
        "never" => Ok(PersistMode::Never),
        other => Err(format!("unknown persist mode '{other}' (default, always, never)")),
    }
}
