//! Lazy, paginated entry cache.
//!
//! Entries live in two tiers:
//!
//! - the **page tier** holds entries delivered by pagination, in server
//!   order; its insertion order is the catalog's iteration order
//! - the **direct tier** holds entries fetched by name that no page has
//!   delivered yet
//!
//! Lookups consult the direct tier, then the page tier, then the server.
//! Iteration only ever walks the page tier, so point lookups never disturb
//! the order in which the catalog is listed. A name may end up in both
//! tiers once a page catches up with an earlier lookup; both copies
//! describe the same entry and the direct copy is simply never evicted.
//!
//! ```text
//!  entries()  ──► page tier (cached, in order) ──► fetch_page(offset) ──► ...
//!                                                     │ short page
//!                                                     ▼
//!                                                  complete
//!  lookup(n)  ──► direct tier ──► page tier ──► fetch_by_name(n) ──► direct tier
//! ```

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use indexmap::IndexMap;

use crate::client::{CatalogClient, Page};
use crate::entry::RemoteEntry;
use crate::error::Result;

/// Where the cache gets entries it does not hold yet.
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// Fetches up to `page_size` entries starting at `offset`, in server
    /// order.
    async fn fetch_page(&self, offset: usize, page_size: NonZeroUsize) -> Result<Page>;

    /// Fetches one entry by name.
    ///
    /// Fails with [`crate::RemoteError::NotFound`] if no such entry exists.
    async fn fetch_by_name(&self, name: &str) -> Result<RemoteEntry>;
}

#[async_trait]
impl EntrySource for Arc<CatalogClient> {
    async fn fetch_page(&self, offset: usize, page_size: NonZeroUsize) -> Result<Page> {
        CatalogClient::fetch_page(self, offset, page_size).await
    }

    async fn fetch_by_name(&self, name: &str) -> Result<RemoteEntry> {
        CatalogClient::fetch_by_name(self, name).await
    }
}

/// Whether entries are fetched page by page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// Entries are fetched lazily, `page_size` at a time.
    Enabled {
        /// Entries per page.
        page_size: NonZeroUsize,
    },
    /// All entries arrive with the catalog metadata.
    Disabled,
}

impl Pagination {
    /// Pagination for an optional page size.
    #[must_use]
    pub const fn from_page_size(page_size: Option<NonZeroUsize>) -> Self {
        match page_size {
            Some(page_size) => Self::Enabled { page_size },
            None => Self::Disabled,
        }
    }

    /// The page size, if paginating.
    #[must_use]
    pub const fn page_size(self) -> Option<NonZeroUsize> {
        match self {
            Self::Enabled { page_size } => Some(page_size),
            Self::Disabled => None,
        }
    }
}

/// Two-tier cache of a catalog's entries.
#[derive(Debug)]
pub struct EntryCache {
    pagination: Pagination,
    page_tier: IndexMap<String, RemoteEntry>,
    direct_tier: IndexMap<String, RemoteEntry>,
    page_offset: usize,
    complete: bool,
    declared_len: Option<usize>,
}

impl EntryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(pagination: Pagination) -> Self {
        Self {
            pagination,
            page_tier: IndexMap::new(),
            direct_tier: IndexMap::new(),
            page_offset: 0,
            complete: pagination == Pagination::Disabled,
            declared_len: None,
        }
    }

    /// Current pagination state.
    #[must_use]
    pub const fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// True once every page has been fetched, or when not paginating.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Offset of the next page to fetch.
    #[must_use]
    pub const fn page_offset(&self) -> usize {
        self.page_offset
    }

    /// Number of entries delivered by pages so far.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.page_tier.len()
    }

    /// Clears both tiers and rewinds pagination.
    pub fn reset(&mut self) {
        self.page_tier.clear();
        self.direct_tier.clear();
        self.page_offset = 0;
        self.complete = self.pagination == Pagination::Disabled;
    }

    /// Records the total length declared by the server.
    pub fn set_declared_len(&mut self, len: Option<usize>) {
        self.declared_len = len;
    }

    /// Switches pagination off for good and takes `entries` as the whole
    /// catalog, in order.
    ///
    /// Used when the server answers a metadata-only request with every entry
    /// anyway, which older servers do.
    pub fn adopt_full_listing(&mut self, entries: Page) {
        if let Pagination::Enabled { page_size } = self.pagination {
            tracing::warn!(
                page_size = page_size.get(),
                entries = entries.len(),
                "Server does not paginate; disabling pagination"
            );
            self.pagination = Pagination::Disabled;
        }
        self.complete = true;
        self.page_tier.extend(entries);
    }

    /// Iterates over cached entries, page tier first, without any requests.
    pub fn cached_items(&self) -> impl Iterator<Item = (&str, &RemoteEntry)> {
        self.page_tier
            .iter()
            .chain(self.direct_tier.iter())
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// Returns a cursor over every entry in server order, fetching pages
    /// from `source` as it goes.
    pub fn entries<'a, S>(&'a mut self, source: &'a S) -> EntryCursor<'a, S>
    where
        S: EntrySource + ?Sized,
    {
        EntryCursor {
            cache: self,
            source,
            position: 0,
            pending: VecDeque::new(),
            state: CursorState::Cached,
        }
    }

    /// Looks up `name`, fetching it from `source` if it is not cached.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RemoteError::NotFound`] if the server has no such
    /// entry, or the fetch error otherwise. Nothing is cached on failure.
    pub async fn lookup<S>(&mut self, name: &str, source: &S) -> Result<RemoteEntry>
    where
        S: EntrySource + ?Sized,
    {
        if let Some(entry) = self.direct_tier.get(name).or_else(|| self.page_tier.get(name)) {
            return Ok(entry.clone());
        }

        let entry = source.fetch_by_name(name).await?;
        self.direct_tier.insert(name.to_string(), entry.clone());
        Ok(entry)
    }

    /// Number of entries in the catalog.
    ///
    /// Uses the server-declared length when known. Otherwise every page is
    /// fetched and counted.
    ///
    /// # Errors
    ///
    /// Returns the first page fetch error.
    pub async fn len<S>(&mut self, source: &S) -> Result<usize>
    where
        S: EntrySource + ?Sized,
    {
        if let Some(len) = self.declared_len {
            return Ok(len);
        }

        let mut cursor = self.entries(source);
        let mut count = 0;
        while let Some(item) = cursor.next_entry().await {
            item?;
            count += 1;
        }
        Ok(count)
    }

    async fn fetch_next_page<S>(
        &mut self,
        source: &S,
        page_size: NonZeroUsize,
    ) -> Result<Vec<(String, RemoteEntry)>>
    where
        S: EntrySource + ?Sized,
    {
        let page = source.fetch_page(self.page_offset, page_size).await?;
        self.page_offset += page.len();
        if page.len() < page_size.get() {
            self.complete = true;
        }

        let items: Vec<(String, RemoteEntry)> = page.into_iter().collect();
        for (name, entry) in &items {
            self.page_tier.insert(name.clone(), entry.clone());
        }
        Ok(items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// Replaying the page tier.
    Cached,
    /// Draining fetched pages and requesting more.
    Fetching,
    Done,
}

/// Resumable walk over a catalog's entries.
///
/// The cursor first replays the entries already cached, then fetches pages
/// from where the last walk stopped. Dropping it early leaves the cache
/// ready for the next walk.
pub struct EntryCursor<'a, S: EntrySource + ?Sized> {
    cache: &'a mut EntryCache,
    source: &'a S,
    position: usize,
    pending: VecDeque<(String, RemoteEntry)>,
    state: CursorState,
}

impl<'a, S: EntrySource + ?Sized> EntryCursor<'a, S> {
    /// Returns the next entry, or `None` when the catalog is exhausted.
    ///
    /// A failed page fetch is returned once and ends this walk; the cache
    /// keeps its offset so a new walk retries the same page.
    pub async fn next_entry(&mut self) -> Option<Result<(String, RemoteEntry)>> {
        loop {
            match self.state {
                CursorState::Cached => {
                    if let Some((name, entry)) = self.cache.page_tier.get_index(self.position) {
                        self.position += 1;
                        return Some(Ok((name.clone(), entry.clone())));
                    }
                    self.state = CursorState::Fetching;
                }
                CursorState::Fetching => {
                    if let Some(item) = self.pending.pop_front() {
                        return Some(Ok(item));
                    }
                    let Pagination::Enabled { page_size } = self.cache.pagination else {
                        self.state = CursorState::Done;
                        continue;
                    };
                    if self.cache.complete {
                        self.state = CursorState::Done;
                        continue;
                    }
                    match self.cache.fetch_next_page(self.source, page_size).await {
                        Ok(items) => self.pending.extend(items),
                        Err(e) => {
                            self.state = CursorState::Done;
                            return Some(Err(e));
                        }
                    }
                }
                CursorState::Done => return None,
            }
        }
    }

    /// Drains the cursor into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error.
    pub async fn try_collect(mut self) -> Result<Vec<(String, RemoteEntry)>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_entry().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Drains the cursor, keeping only names.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error.
    pub async fn names(mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        while let Some(item) = self.next_entry().await {
            names.push(item?.0);
        }
        Ok(names)
    }

    /// Converts the cursor into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<(String, RemoteEntry)>> + 'a
    where
        S: 'a,
    {
        futures::stream::unfold(self, |mut cursor| async move {
            let item = cursor.next_entry().await?;
            Some((item, cursor))
        })
    }
}
