//! Configuration types for remote catalogs.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quarry_core::{PersistMode, TemplateOptions};
use url::Url;

use crate::auth::{ClientAuth, NoAuth};
use crate::error::{RemoteError, Result};

/// URL scheme that stands for "http, or https when `ssl` is set".
pub const QUARRY_SCHEME: &str = "quarry";

/// Connection settings for a remote catalog.
///
/// Entries and nested catalogs inherit these settings from the catalog that
/// produced them.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Server address (e.g., `quarry://localhost:5000`).
    pub url: String,

    /// Use https when `url` has the `quarry` scheme.
    pub ssl: bool,

    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,

    /// Extra query parameters sent with every request.
    pub params: BTreeMap<String, String>,

    /// Authentication header provider.
    pub auth: Arc<dyn ClientAuth>,

    /// Entries fetched per page while iterating; `None` fetches everything
    /// with the metadata.
    pub page_size: Option<NonZeroUsize>,

    /// Server-assigned scope this catalog is bound to.
    pub source_id: Option<String>,

    /// Catalog name; derived from the URL when unset.
    pub name: Option<String>,

    /// Lifetime of loaded metadata; `None` never reloads on its own.
    pub ttl: Option<Duration>,

    /// Whether parameter defaults may read environment variables.
    pub getenv: bool,

    /// Whether parameter defaults may run shell commands.
    pub getshell: bool,

    /// Persistence preference carried to entries.
    pub persist_mode: PersistMode,

    /// Request timeout.
    pub timeout: Duration,

    /// TLS configuration for https servers.
    pub tls: Option<TlsConfig>,

    /// User agent string.
    pub user_agent: String,
}

impl CatalogConfig {
    /// Creates a configuration for the server at `url`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_remote::CatalogConfig;
    ///
    /// let config = CatalogConfig::new("quarry://localhost:5000");
    /// assert_eq!(config.url, "quarry://localhost:5000");
    /// assert!(config.page_size.is_none());
    /// ```
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ssl: false,
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            auth: Arc::new(NoAuth),
            page_size: None,
            source_id: None,
            name: None,
            ttl: None,
            getenv: true,
            getshell: true,
            persist_mode: PersistMode::Default,
            timeout: Duration::from_secs(30),
            tls: None,
            user_agent: format!("quarry-remote/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Uses https for `quarry://` URLs.
    #[must_use]
    pub const fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a query parameter sent with every request.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets the authentication header provider.
    #[must_use]
    pub fn with_auth(mut self, auth: impl ClientAuth + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Sets the page size; `0` disables pagination.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_remote::CatalogConfig;
    ///
    /// let paged = CatalogConfig::new("quarry://localhost:5000").with_page_size(100);
    /// assert_eq!(paged.page_size.map(|n| n.get()), Some(100));
    ///
    /// let bulk = paged.with_page_size(0);
    /// assert!(bulk.page_size.is_none());
    /// ```
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = NonZeroUsize::new(page_size);
        self
    }

    /// Binds the catalog to a server-assigned scope.
    #[must_use]
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Sets an explicit catalog name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the metadata lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Enables or disables environment and shell expansion of defaults.
    #[must_use]
    pub const fn with_expansion(mut self, getenv: bool, getshell: bool) -> Self {
        self.getenv = getenv;
        self.getshell = getshell;
        self
    }

    /// Sets the persistence preference carried to entries.
    #[must_use]
    pub const fn with_persist_mode(mut self, mode: PersistMode) -> Self {
        self.persist_mode = mode;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the TLS configuration.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Returns a copy bound to `source_id`, as produced by a search.
    #[must_use]
    pub fn scoped(&self, source_id: impl Into<String>) -> Self {
        let mut config = self.clone();
        config.source_id = Some(source_id.into());
        config.name = Some(String::new());
        config
    }

    /// Returns the server base URL, always ending in `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or uses an unsupported
    /// scheme.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_remote::CatalogConfig;
    ///
    /// let config = CatalogConfig::new("quarry://localhost:5000");
    /// assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:5000/");
    ///
    /// let secure = CatalogConfig::new("quarry://example.com/catalogs").with_ssl(true);
    /// assert_eq!(secure.base_url().unwrap().as_str(), "https://example.com/catalogs/");
    /// ```
    pub fn base_url(&self) -> Result<Url> {
        let raw = match self.url.strip_prefix(QUARRY_SCHEME) {
            Some(rest) if rest.starts_with("://") => {
                let scheme = if self.ssl { "https" } else { "http" };
                format!("{scheme}{rest}")
            }
            _ => self.url.clone(),
        };
        let raw = if raw.ends_with('/') { raw } else { format!("{raw}/") };

        let url = Url::parse(&raw).map_err(|_| RemoteError::InvalidUrl {
            url: self.url.clone(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(RemoteError::InvalidUrl {
                url: self.url.clone(),
            }),
        }
    }

    /// Endpoint serving catalog metadata and pages.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn info_url(&self) -> Result<Url> {
        Ok(self.base_url()?.join("v1/info")?)
    }

    /// Endpoint serving single entries, search and open.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn source_url(&self) -> Result<Url> {
        Ok(self.base_url()?.join("v1/source")?)
    }

    /// Name of the catalog built from this configuration.
    ///
    /// An explicit name wins. Otherwise an unscoped catalog is named after
    /// the server address with `.` and `:` replaced by `_`, and a scoped one
    /// is unnamed.
    #[must_use]
    pub fn catalog_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if self.source_id.is_some() {
            return String::new();
        }
        self.base_url()
            .ok()
            .and_then(|url| {
                let host = url.host_str()?.to_string();
                Some(match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host,
                })
            })
            .unwrap_or_default()
            .replace(['.', ':'], "_")
    }

    /// Template expansion settings for parameter defaults.
    #[must_use]
    pub const fn template_options(&self) -> TemplateOptions {
        TemplateOptions::client(self.getenv, self.getshell)
    }
}

/// TLS configuration for https connections.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Path to a PEM CA certificate to trust.
    pub ca_cert: Option<PathBuf>,

    /// Path to a PEM client certificate.
    pub client_cert: Option<PathBuf>,

    /// Path to the PEM private key for `client_cert`.
    pub client_key: Option<PathBuf>,

    /// Skip certificate verification (testing only).
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    /// Creates an empty TLS configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ca_cert: None,
            client_cert: None,
            client_key: None,
            insecure_skip_verify: false,
        }
    }

    /// Sets the CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    /// Sets client certificate and key paths.
    #[must_use]
    pub fn with_client_cert(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(cert.into());
        self.client_key = Some(key.into());
        self
    }

    /// Skips certificate verification.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.insecure_skip_verify = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CatalogConfig::new("quarry://localhost:5000");
        assert!(config.getenv);
        assert!(config.getshell);
        assert!(config.source_id.is_none());
        assert!(config.ttl.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.persist_mode, PersistMode::Default);
    }

    #[test]
    fn test_endpoints() {
        let config = CatalogConfig::new("http://localhost:5000/root");
        assert_eq!(
            config.info_url().unwrap().as_str(),
            "http://localhost:5000/root/v1/info"
        );
        assert_eq!(
            config.source_url().unwrap().as_str(),
            "http://localhost:5000/root/v1/source"
        );
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let config = CatalogConfig::new("ftp://localhost");
        assert!(matches!(config.base_url(), Err(RemoteError::InvalidUrl { .. })));
    }

    #[test]
    fn test_catalog_name_from_address() {
        let config = CatalogConfig::new("quarry://data.example.com:5000");
        assert_eq!(config.catalog_name(), "data_example_com_5000");
    }

    #[test]
    fn test_catalog_name_scoped_is_empty() {
        let config = CatalogConfig::new("quarry://localhost:5000").with_source_id("abc");
        assert_eq!(config.catalog_name(), "");
    }

    #[test]
    fn test_explicit_name_wins() {
        let config = CatalogConfig::new("quarry://localhost:5000").with_name("weather");
        assert_eq!(config.catalog_name(), "weather");
    }

    #[test]
    fn test_scoped_keeps_connection_settings() {
        let config = CatalogConfig::new("quarry://localhost:5000")
            .with_header("x-team", "ops")
            .with_page_size(10)
            .with_expansion(false, false);
        let scoped = config.scoped("scope-1");
        assert_eq!(scoped.source_id.as_deref(), Some("scope-1"));
        assert_eq!(scoped.headers.get("x-team").map(String::as_str), Some("ops"));
        assert_eq!(scoped.page_size, config.page_size);
        assert!(!scoped.getenv);
    }

    #[test]
    fn test_tls_config() {
        let tls = TlsConfig::new()
            .with_ca_cert("/path/to/ca.crt")
            .with_client_cert("/path/to/client.crt", "/path/to/client.key");

        assert_eq!(tls.ca_cert, Some(PathBuf::from("/path/to/ca.crt")));
        assert_eq!(tls.client_cert, Some(PathBuf::from("/path/to/client.crt")));
        assert!(!tls.insecure_skip_verify);
    }
}
