//! Sources produced by opening an entry.
//!
//! Opening an entry yields one of two things. If the server names a plugin
//! the client has, the client builds the source itself from the returned
//! arguments and needs the server no longer ([`DirectSource`]). Otherwise
//! the source stays on the server and is read through it ([`ProxySource`]).

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::catalog::RemoteCatalog;
use crate::client::CatalogClient;
use crate::entry::RemoteEntry;
use crate::error::{RemoteError, Result};

/// Container kind of entries that are catalogs themselves.
pub const CATALOG_CONTAINER: &str = "catalog";

/// Plugins this client can instantiate locally.
///
/// The names are advertised to the server on every open request; the server
/// only offers direct access through plugins in this set.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeSet<String>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin.
    #[must_use]
    pub fn with_plugin(mut self, name: impl Into<String>) -> Self {
        self.plugins.insert(name.into());
        self
    }

    /// True if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains(name)
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PluginRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            plugins: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// An opened entry.
#[derive(Debug, Clone)]
pub enum ResolvedSource {
    /// Built locally by a registered plugin.
    Direct(DirectSource),
    /// Served through the catalog server.
    Proxy(ProxySource),
}

impl ResolvedSource {
    /// Classifies the server's answer to an open request.
    pub(crate) fn from_open_response(
        entry: &RemoteEntry,
        parameters: Map<String, Value>,
        mut response: Map<String, Value>,
        plugins: &PluginRegistry,
    ) -> Result<Self> {
        let offered = match response.get("plugin") {
            Some(Value::String(name)) => vec![name.clone()],
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        if let Some(plugin) = offered.into_iter().find(|p| plugins.contains(p)) {
            let args = match response.remove("args") {
                Some(Value::Object(args)) => args,
                None | Some(Value::Null) => Map::new(),
                Some(other) => {
                    return Err(RemoteError::InvalidResponse {
                        message: format!("plugin arguments are not a record: {other}"),
                    })
                }
            };
            tracing::debug!(name = entry.name(), plugin = %plugin, "Opened entry for direct access");
            return Ok(Self::Direct(DirectSource {
                name: entry.name().to_string(),
                plugin,
                args,
                description: entry.description().to_string(),
            }));
        }

        response.remove("container");
        response.insert("name".to_string(), Value::String(entry.name().to_string()));
        response.insert("parameters".to_string(), Value::Object(parameters.clone()));

        tracing::debug!(
            name = entry.name(),
            container = entry.container(),
            "Opened entry as proxy"
        );
        Ok(Self::Proxy(ProxySource {
            name: entry.name().to_string(),
            container: entry.container().to_string(),
            parameters,
            description: entry.description().to_string(),
            fields: response,
            client: Arc::clone(entry.client()),
        }))
    }

    /// True for [`ResolvedSource::Direct`].
    #[must_use]
    pub const fn is_direct(&self) -> bool {
        matches!(self, Self::Direct(_))
    }

    /// Description inherited from the entry.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Direct(source) => &source.description,
            Self::Proxy(source) => &source.description,
        }
    }
}

/// A source the client builds itself.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectSource {
    /// Entry name.
    pub name: String,
    /// Registered plugin chosen to build the source.
    pub plugin: String,
    /// Constructor arguments for `plugin`.
    pub args: Map<String, Value>,
    /// Description inherited from the entry.
    pub description: String,
}

/// A source read through the catalog server.
///
/// Keeps the connection settings of its catalog (headers, auth, page size,
/// persistence, expansion flags) for the calls it still has to make.
#[derive(Debug, Clone)]
pub struct ProxySource {
    /// Entry name.
    pub name: String,
    /// Container kind.
    pub container: String,
    /// Parameters the entry was opened with.
    pub parameters: Map<String, Value>,
    /// Description inherited from the entry.
    pub description: String,
    /// Remaining fields of the server's answer (e.g. `source_id`, `shape`,
    /// `npartitions`, `metadata`).
    pub fields: Map<String, Value>,
    client: Arc<CatalogClient>,
}

impl ProxySource {
    /// Server-side handle of the opened source.
    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        self.fields.get("source_id").and_then(Value::as_str)
    }

    /// Metadata reported by the server, if any.
    #[must_use]
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.fields.get("metadata").and_then(Value::as_object)
    }

    /// True if this source is a nested catalog.
    #[must_use]
    pub fn is_catalog(&self) -> bool {
        self.container == CATALOG_CONTAINER
    }

    /// Opens a nested catalog as a [`RemoteCatalog`] and loads it.
    ///
    /// The nested catalog is bound to the scope the server returned and
    /// inherits the parent's connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::UnsupportedContainer`] if this is not a
    /// catalog, [`RemoteError::InvalidResponse`] if the server sent no
    /// scope, or the load error.
    pub async fn into_catalog(self) -> Result<RemoteCatalog> {
        if !self.is_catalog() {
            return Err(RemoteError::UnsupportedContainer {
                name: self.name,
                container: self.container,
            });
        }
        let source_id = self
            .source_id()
            .ok_or_else(|| RemoteError::InvalidResponse {
                message: format!("nested catalog {:?} has no source_id", self.name),
            })?
            .to_string();

        let mut config = self.client.config().scoped(source_id);
        config.name = Some(self.name.clone());
        let client = Arc::new(self.client.rebind(config)?);

        let mut catalog = RemoteCatalog::from_client(client);
        catalog.load().await?;
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryRecord;
    use crate::testing::{entry_with, FakeSource};
    use serde_json::json;

    fn response(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn trips(source: &FakeSource) -> RemoteEntry {
        let mut record = EntryRecord::new("trips", "dataframe");
        record.description = "Taxi trips".to_string();
        entry_with(source, record)
    }

    #[test]
    fn test_registry_names_sorted() {
        let registry: PluginRegistry = ["parquet", "csv"].into_iter().collect();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["csv", "parquet"]);
        assert!(registry.contains("csv"));
        assert!(!registry.contains("zarr"));
    }

    #[test]
    fn test_direct_when_plugin_registered() {
        let source = FakeSource::new(&[]);
        let registry = PluginRegistry::new().with_plugin("csv");

        let resolved = ResolvedSource::from_open_response(
            &trips(&source),
            Map::new(),
            response(json!({"plugin": "csv", "args": {"urlpath": "trips.csv"}})),
            &registry,
        )
        .unwrap();

        let ResolvedSource::Direct(direct) = resolved else {
            panic!("expected direct source");
        };
        assert_eq!(direct.plugin, "csv");
        assert_eq!(direct.args["urlpath"], "trips.csv");
        assert_eq!(direct.description, "Taxi trips");
    }

    #[test]
    fn test_first_registered_plugin_in_list_wins() {
        let source = FakeSource::new(&[]);
        let registry = PluginRegistry::new().with_plugin("parquet").with_plugin("csv");

        let resolved = ResolvedSource::from_open_response(
            &trips(&source),
            Map::new(),
            response(json!({"plugin": ["zarr", "csv", "parquet"], "args": {}})),
            &registry,
        )
        .unwrap();

        assert!(matches!(resolved, ResolvedSource::Direct(ref d) if d.plugin == "csv"));
    }

    #[test]
    fn test_proxy_when_no_plugin_matches() {
        let source = FakeSource::new(&[]);
        let mut parameters = Map::new();
        parameters.insert("year".to_string(), json!(2020));

        let resolved = ResolvedSource::from_open_response(
            &trips(&source),
            parameters,
            response(json!({
                "plugin": "zarr",
                "container": "dataframe",
                "source_id": "abc",
                "npartitions": 4
            })),
            &PluginRegistry::new(),
        )
        .unwrap();

        let ResolvedSource::Proxy(proxy) = resolved else {
            panic!("expected proxy source");
        };
        assert_eq!(proxy.source_id(), Some("abc"));
        assert_eq!(proxy.fields["name"], "trips");
        assert_eq!(proxy.fields["parameters"], json!({"year": 2020}));
        assert!(!proxy.fields.contains_key("container"));
        assert!(!proxy.is_catalog());
    }

    #[tokio::test]
    async fn test_into_catalog_rejects_other_containers() {
        let source = FakeSource::new(&[]);
        let resolved = ResolvedSource::from_open_response(
            &trips(&source),
            Map::new(),
            response(json!({"container": "dataframe", "source_id": "abc"})),
            &PluginRegistry::new(),
        )
        .unwrap();
        let ResolvedSource::Proxy(proxy) = resolved else {
            panic!("expected proxy source");
        };

        let err = proxy.into_catalog().await.unwrap_err();
        assert!(matches!(err, RemoteError::UnsupportedContainer { .. }));
    }

    #[test]
    fn test_bad_args_rejected() {
        let source = FakeSource::new(&[]);
        let err = ResolvedSource::from_open_response(
            &trips(&source),
            Map::new(),
            response(json!({"plugin": "csv", "args": [1, 2]})),
            &PluginRegistry::new().with_plugin("csv"),
        )
        .unwrap_err();
        assert!(matches!(err, RemoteError::InvalidResponse { .. }));
    }
}
