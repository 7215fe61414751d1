//! Remote catalog client.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::cache::{EntryCache, EntryCursor, Pagination};
use crate::client::CatalogClient;
use crate::codec::{EntryCodec, JsonCodec};
use crate::config::CatalogConfig;
use crate::entry::RemoteEntry;
use crate::error::Result;
use crate::transport::{HttpTransport, Transport};
use crate::wire::SearchQuery;

/// A catalog served by a remote server.
///
/// Metadata is loaded on first use (or explicitly with [`load`]). Entries are
/// fetched lazily, page by page when a page size is configured, and cached
/// for the lifetime of the loaded metadata.
///
/// [`load`]: RemoteCatalog::load
///
/// # Examples
///
/// ```rust,no_run
/// use quarry_remote::{CatalogConfig, RemoteCatalog};
///
/// # async fn example() -> quarry_remote::Result<()> {
/// let config = CatalogConfig::new("quarry://localhost:5000").with_page_size(100);
/// let mut catalog = RemoteCatalog::connect(config).await?;
///
/// let mut entries = catalog.entries().await?;
/// while let Some(item) = entries.next_entry().await {
///     let (name, entry) = item?;
///     println!("{name}: {}", entry.description());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RemoteCatalog {
    client: Arc<CatalogClient>,
    cache: EntryCache,
    name: String,
    metadata: Map<String, Value>,
    loaded_at: Option<Instant>,
}

impl RemoteCatalog {
    /// Creates a catalog over HTTP without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport), Arc::new(JsonCodec))
    }

    /// Creates a catalog over a custom transport and codec.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_transport(
        config: CatalogConfig,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn EntryCodec>,
    ) -> Result<Self> {
        let client = CatalogClient::new(config, transport, codec)?;
        Ok(Self::from_client(Arc::new(client)))
    }

    /// Creates a catalog over HTTP and loads its metadata.
    ///
    /// # Errors
    ///
    /// Returns the construction or load error.
    pub async fn connect(config: CatalogConfig) -> Result<Self> {
        let mut catalog = Self::new(config)?;
        catalog.load().await?;
        Ok(catalog)
    }

    /// Creates a catalog over a custom transport and codec and loads its
    /// metadata.
    ///
    /// # Errors
    ///
    /// Returns the construction or load error.
    pub async fn connect_with(
        config: CatalogConfig,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn EntryCodec>,
    ) -> Result<Self> {
        let mut catalog = Self::with_transport(config, transport, codec)?;
        catalog.load().await?;
        Ok(catalog)
    }

    pub(crate) fn from_client(client: Arc<CatalogClient>) -> Self {
        let config = client.config();
        Self {
            cache: EntryCache::new(Pagination::from_page_size(config.page_size)),
            name: config.catalog_name(),
            metadata: Map::new(),
            loaded_at: None,
            client,
        }
    }

    /// Loads catalog metadata and clears the entry cache.
    ///
    /// When paginating only metadata is requested. A server that answers with
    /// its entries anyway has them adopted as the whole catalog, and
    /// pagination stays off for this catalog from then on.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RemoteError::AuthenticationFailure`] on 403 and
    /// [`crate::RemoteError::RemoteCatalog`] on other failures.
    pub async fn load(&mut self) -> Result<()> {
        let paginated = self.cache.pagination() != Pagination::Disabled;
        let info = self.client.fetch_info(paginated).await?;

        self.metadata = info.metadata;
        self.cache.set_declared_len(info.length);
        self.cache.reset();
        if !info.sources.is_empty() || !paginated {
            let entries = self.client.entries_from(info.sources);
            self.cache.adopt_full_listing(entries);
        }
        self.loaded_at = Some(Instant::now());

        tracing::info!(
            name = %self.name,
            url = %self.client.base_url(),
            length = ?info.length,
            page_size = ?self.page_size(),
            "Loaded remote catalog"
        );
        Ok(())
    }

    /// Loads metadata if it was never loaded or its lifetime has passed.
    async fn ensure_loaded(&mut self) -> Result<()> {
        let expired = match (self.loaded_at, self.client.config().ttl) {
            (None, _) => true,
            (Some(at), Some(ttl)) => at.elapsed() >= ttl,
            (Some(_), None) => false,
        };
        if expired {
            self.load().await?;
        }
        Ok(())
    }

    /// Returns a cursor over every entry in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if metadata has to be (re)loaded and that fails.
    pub async fn entries(&mut self) -> Result<EntryCursor<'_, Arc<CatalogClient>>> {
        self.ensure_loaded().await?;
        Ok(self.cache.entries(&self.client))
    }

    /// Looks up an entry by name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RemoteError::NotFound`] if the server has no such
    /// entry.
    pub async fn get(&mut self, name: &str) -> Result<RemoteEntry> {
        self.ensure_loaded().await?;
        self.cache.lookup(name, &self.client).await
    }

    /// Number of entries.
    ///
    /// Uses the length declared by the server; older servers do not declare
    /// one, in which case every page is fetched and counted.
    ///
    /// # Errors
    ///
    /// Returns the load or page fetch error.
    pub async fn len(&mut self) -> Result<usize> {
        self.ensure_loaded().await?;
        self.cache.len(&self.client).await
    }

    /// True if the catalog has no entries.
    ///
    /// # Errors
    ///
    /// Returns the load or page fetch error.
    pub async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Runs a server-side search.
    ///
    /// The result is a new, loaded catalog bound to the scope the server
    /// returned, with this catalog's connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RemoteError::RemoteCatalog`] if the search or the
    /// load of the new catalog fails.
    pub async fn search(&self, query: &SearchQuery) -> Result<Self> {
        let source_id = self.client.search(query).await?;
        tracing::info!(
            catalog = %self.name,
            source_id = %source_id,
            "Search returned scoped catalog"
        );

        let mut config = self.client.config().scoped(source_id);
        config.page_size = self.page_size();
        let client = Arc::new(self.client.rebind(config)?);

        let mut catalog = Self::from_client(client);
        catalog.load().await?;
        Ok(catalog)
    }

    /// Names for interactive completion.
    ///
    /// Makes sure at least one page is cached, then returns the cached names
    /// without fetching the rest of the catalog.
    ///
    /// # Errors
    ///
    /// Returns the load or page fetch error.
    pub async fn completions(&mut self) -> Result<Vec<String>> {
        self.ensure_loaded().await?;
        if !self.cache.is_complete() {
            self.cache.entries(&self.client).next_entry().await.transpose()?;
        }
        if !self.cache.is_complete() {
            tracing::warn!(
                catalog = %self.name,
                cached = self.cache.cached_len(),
                "Completions cover only the entries fetched so far"
            );
        }
        Ok(self
            .cache
            .cached_items()
            .map(|(name, _)| name.to_string())
            .collect())
    }

    /// Cached entries, page tier first, without any requests.
    pub fn cached_items(&self) -> impl Iterator<Item = (&str, &RemoteEntry)> {
        self.cache.cached_items()
    }

    /// Current page size; `None` once pagination is off.
    #[must_use]
    pub const fn page_size(&self) -> Option<NonZeroUsize> {
        self.cache.pagination().page_size()
    }

    /// Scope this catalog is bound to.
    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        self.client.config().source_id.as_deref()
    }

    /// Catalog name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Catalog-level metadata from the last load.
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// True once every entry has been fetched.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.cache.is_complete()
    }

    /// The entry cache.
    #[must_use]
    pub const fn cache(&self) -> &EntryCache {
        &self.cache
    }

    /// Connection settings.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        self.client.config()
    }
}
