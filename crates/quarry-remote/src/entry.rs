//! Catalog entries and their resolution into sources.

use std::fmt;
use std::sync::Arc;

use quarry_core::{null_as_default, UserParameter};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::client::CatalogClient;
use crate::error::Result;
use crate::resolve::{PluginRegistry, ResolvedSource};

/// Whether the server lets clients read an entry's data directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectAccess {
    /// Data is only served through the server.
    #[default]
    Forbid,
    /// The client may read the data itself if it has a suitable plugin.
    Allow,
    /// The client must read the data itself.
    Force,
}

impl<'de> Deserialize<'de> for DirectAccess {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Older servers send a boolean.
        match Value::deserialize(deserializer)? {
            Value::Bool(false) | Value::Null => Ok(Self::Forbid),
            Value::Bool(true) => Ok(Self::Allow),
            Value::String(s) => match s.as_str() {
                "forbid" => Ok(Self::Forbid),
                "allow" => Ok(Self::Allow),
                "force" => Ok(Self::Force),
                other => Err(serde::de::Error::unknown_variant(
                    other,
                    &["forbid", "allow", "force"],
                )),
            },
            other => Err(serde::de::Error::custom(format!(
                "invalid direct_access value: {other}"
            ))),
        }
    }
}

/// Metadata describing one entry, as sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Name, unique within the catalog.
    pub name: String,

    /// Kind of resource the entry resolves to (e.g. `dataframe`, `catalog`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub container: String,

    /// Human readable description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Free-form metadata.
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,

    /// Parameters accepted when the entry is opened.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_parameters: Vec<UserParameter>,

    /// Direct access policy.
    #[serde(default)]
    pub direct_access: DirectAccess,

    /// Arguments the server uses to build the source.
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Map<String, Value>,

    /// Any further fields the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntryRecord {
    /// Creates a record with only a name and container.
    #[must_use]
    pub fn new(name: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container: container.into(),
            description: String::new(),
            metadata: Map::new(),
            user_parameters: Vec::new(),
            direct_access: DirectAccess::Forbid,
            args: Map::new(),
            extra: Map::new(),
        }
    }
}

/// An entry of a remote catalog.
///
/// Carries the connection settings of the catalog it came from, so it can be
/// opened without going back through the catalog.
#[derive(Clone)]
pub struct RemoteEntry {
    record: EntryRecord,
    client: Arc<CatalogClient>,
}

impl fmt::Debug for RemoteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEntry")
            .field("record", &self.record)
            .field("url", &self.client.base_url().as_str())
            .finish_non_exhaustive()
    }
}

impl RemoteEntry {
    /// Creates an entry for `record`, opened through `client`.
    #[must_use]
    pub fn new(record: EntryRecord, client: Arc<CatalogClient>) -> Self {
        Self { record, client }
    }

    /// Entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Container kind.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.record.container
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.record.description
    }

    /// The record as sent by the server.
    #[must_use]
    pub const fn record(&self) -> &EntryRecord {
        &self.record
    }

    /// Summary of the entry.
    ///
    /// Remote entries always report plugin `"remote"` with the server URL
    /// as their only argument.
    #[must_use]
    pub fn describe(&self) -> Value {
        json!({
            "name": self.record.name,
            "container": self.record.container,
            "plugin": "remote",
            "description": self.record.description,
            "direct_access": self.record.direct_access,
            "metadata": self.record.metadata,
            "user_parameters": self.record.user_parameters,
            "args": [self.client.base_url().as_str()],
        })
    }

    /// Fills in defaults for every declared parameter missing from
    /// `parameters`.
    ///
    /// # Errors
    ///
    /// Returns an error if a string default cannot be coerced to its type.
    pub fn resolve_parameters(
        &self,
        mut parameters: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let options = self.client.config().template_options();
        for param in &self.record.user_parameters {
            if !parameters.contains_key(&param.name) {
                let value = param.resolve_default(&options)?;
                parameters.insert(param.name.clone(), value);
            }
        }
        Ok(parameters)
    }

    /// Opens the entry on the server.
    ///
    /// The server either names a plugin from `plugins` together with its
    /// constructor arguments, giving a [`ResolvedSource::Direct`], or
    /// the entry becomes a [`ResolvedSource::Proxy`] that keeps reading
    /// through the server.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Server`] if the server rejects the request, or
    /// a parameter error if a default cannot be prepared.
    pub async fn get(
        &self,
        parameters: Map<String, Value>,
        plugins: &PluginRegistry,
    ) -> Result<ResolvedSource> {
        let parameters = self.resolve_parameters(parameters)?;

        tracing::debug!(name = %self.record.name, "Opening entry");
        let response = self
            .client
            .open(&self.record.name, &parameters, plugins.names().collect())
            .await?;

        ResolvedSource::from_open_response(self, parameters, response, plugins)
    }

    pub(crate) fn client(&self) -> &Arc<CatalogClient> {
        &self.client
    }
}
