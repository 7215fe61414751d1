//! Messages exchanged with a catalog server.
//!
//! - `GET v1/info[?page_offset&page_size]` answers with [`InfoResponse`]
//! - `GET v1/source?name=..` answers with [`SourceResponse`]
//! - `POST v1/source` with [`SearchRequest`] answers with [`SearchResponse`]
//! - `POST v1/source` with [`OpenRequest`] answers with a plain record that
//!   either names plugins for direct access or describes a proxy

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entry::EntryRecord;

/// Query parameter carrying the first entry of a page.
pub const PAGE_OFFSET_PARAM: &str = "page_offset";

/// Query parameter carrying the number of entries in a page.
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// Header binding a request to a server-assigned scope.
pub const SOURCE_ID_HEADER: &str = "source-id";

/// Catalog metadata, optionally with a page (or all) of its entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfoResponse {
    /// Catalog-level metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Total number of entries; absent on older servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,

    /// Entries, in server order.
    #[serde(default)]
    pub sources: Vec<EntryRecord>,
}

/// A single entry looked up by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResponse {
    /// The entry.
    pub source: EntryRecord,
}

/// Positional and keyword arguments of a server-side search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Keyword arguments.
    pub kwargs: Map<String, Value>,
}

impl SearchQuery {
    /// Creates a query from positional text.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_remote::SearchQuery;
    ///
    /// let query = SearchQuery::text("temperature").with_kwarg("depth", 2);
    /// assert_eq!(query.args.len(), 1);
    /// assert_eq!(query.kwargs["depth"], 2);
    /// ```
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            args: vec![Value::String(text.into())],
            kwargs: Map::new(),
        }
    }

    /// Adds a keyword argument.
    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Adds a positional argument.
    #[must_use]
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }
}

/// Body of a search request.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest<'a> {
    /// Always `"search"`.
    pub action: &'static str,
    /// Query as a `[args, kwargs]` pair.
    pub query: (&'a [Value], &'a Map<String, Value>),
    /// Scope to search within.
    pub source_id: Option<&'a str>,
}

impl<'a> SearchRequest<'a> {
    /// Creates a search within `source_id`, or the whole catalog.
    #[must_use]
    pub fn new(query: &'a SearchQuery, source_id: Option<&'a str>) -> Self {
        Self {
            action: "search",
            query: (&query.args, &query.kwargs),
            source_id,
        }
    }
}

/// Answer to a search: the scope holding the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Server-assigned scope identifier.
    pub source_id: String,
}

/// Body of an open request.
#[derive(Debug, Clone, Serialize)]
pub struct OpenRequest<'a> {
    /// Always `"open"`.
    pub action: &'static str,
    /// Entry name.
    pub name: &'a str,
    /// Resolved user parameters.
    pub parameters: &'a Map<String, Value>,
    /// Plugins the client can instantiate locally.
    pub available_plugins: Vec<&'a str>,
}

impl<'a> OpenRequest<'a> {
    /// Creates an open request.
    #[must_use]
    pub fn new(
        name: &'a str,
        parameters: &'a Map<String, Value>,
        available_plugins: Vec<&'a str>,
    ) -> Self {
        Self {
            action: "open",
            name,
            parameters,
            available_plugins,
        }
    }
}
