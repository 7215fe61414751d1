//! Request plumbing shared by a catalog and its entries.
//!
//! A [`CatalogClient`] holds the connection settings, transport and codec of
//! one catalog. Every remote call of the protocol goes through it, so header
//! merging and error context live in one place.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use url::Url;

use crate::codec::{decode_message, encode_message, EntryCodec};
use crate::config::CatalogConfig;
use crate::entry::{EntryRecord, RemoteEntry};
use crate::error::{RemoteError, Result};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
use crate::wire::{
    InfoResponse, OpenRequest, SearchQuery, SearchRequest, SearchResponse, SourceResponse,
    PAGE_OFFSET_PARAM, PAGE_SIZE_PARAM, SOURCE_ID_HEADER,
};

/// Message shown when the server refuses to serve catalog metadata.
const FORBIDDEN_MESSAGE: &str = "Your current level of authentication does not have access";

/// A page of entries keyed by name, in server order.
pub type Page = IndexMap<String, RemoteEntry>;

/// Connection state of one catalog.
#[derive(Debug)]
pub struct CatalogClient {
    config: CatalogConfig,
    base_url: Url,
    info_url: Url,
    source_url: Url,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn EntryCodec>,
}

impl CatalogClient {
    /// Creates a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is invalid.
    pub fn new(
        config: CatalogConfig,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn EntryCodec>,
    ) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url()?,
            info_url: config.info_url()?,
            source_url: config.source_url()?,
            config,
            transport,
            codec,
        })
    }

    /// Creates a client for another configuration over the same transport
    /// and codec.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is invalid.
    pub fn rebind(&self, config: CatalogConfig) -> Result<Self> {
        Self::new(config, Arc::clone(&self.transport), Arc::clone(&self.codec))
    }

    /// Connection settings.
    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Server base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches catalog metadata.
    ///
    /// With `paginated` set only the metadata is requested (a page of size
    /// zero); otherwise the server is asked for every entry.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::AuthenticationFailure`] on 403 and
    /// [`RemoteError::RemoteCatalog`] on any other failure.
    pub async fn fetch_info(&self, paginated: bool) -> Result<InfoResponse> {
        let mut params = BTreeMap::new();
        if paginated {
            params.insert(PAGE_OFFSET_PARAM.to_string(), "0".to_string());
            params.insert(PAGE_SIZE_PARAM.to_string(), "0".to_string());
        }
        let request = self.prepare(Method::Get, &self.info_url, params, None)?;

        let response = self.send(&request).await;
        let response = match response {
            Ok(response) if response.status == 403 => {
                return Err(RemoteError::AuthenticationFailure {
                    message: FORBIDDEN_MESSAGE.to_string(),
                });
            }
            Ok(response) => response.error_for_status(&request),
            Err(e) => Err(e),
        }
        .map_err(|e| e.context("Failed to fetch metadata"))?;

        decode_message(self.codec.as_ref(), &response.body)
            .map_err(|e| e.context("Failed to decode metadata"))
    }

    /// Fetches up to `page_size` entries starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::RemoteCatalog`] if the request fails.
    pub async fn fetch_page(
        self: &Arc<Self>,
        offset: usize,
        page_size: NonZeroUsize,
    ) -> Result<Page> {
        let end = offset + page_size.get();
        tracing::debug!(offset, page_size = page_size.get(), "Requesting page of entries");

        let params = BTreeMap::from([
            (PAGE_OFFSET_PARAM.to_string(), offset.to_string()),
            (PAGE_SIZE_PARAM.to_string(), page_size.to_string()),
        ]);
        let request = self.prepare(Method::Get, &self.info_url, params, None)?;
        let context = || format!("Failed to fetch page of entries {offset}-{end}");

        let response = self
            .send(&request)
            .await
            .and_then(|r| r.error_for_status(&request))
            .map_err(|e| e.context(context()))?;
        let info: InfoResponse = decode_message(self.codec.as_ref(), &response.body)
            .map_err(|e| e.context(context()))?;

        Ok(self.entries_from(info.sources))
    }

    /// Fetches one entry by name.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] on 404 and
    /// [`RemoteError::RemoteCatalog`] on any other failure.
    pub async fn fetch_by_name(self: &Arc<Self>, name: &str) -> Result<RemoteEntry> {
        tracing::debug!(name, "Requesting entry");

        let params = BTreeMap::from([("name".to_string(), name.to_string())]);
        let request = self.prepare(Method::Get, &self.source_url, params, None)?;
        let context = || format!("Failed to fetch entry {name:?}");

        let response = match self.send(&request).await {
            Ok(response) if response.status == 404 => {
                return Err(RemoteError::NotFound {
                    name: name.to_string(),
                });
            }
            Ok(response) => response.error_for_status(&request),
            Err(e) => Err(e),
        }
        .map_err(|e| e.context(context()))?;

        let reply: SourceResponse = decode_message(self.codec.as_ref(), &response.body)
            .map_err(|e| e.context(context()))?;
        Ok(RemoteEntry::new(reply.source, Arc::clone(self)))
    }

    /// Runs a server-side search and returns the scope holding its results.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::RemoteCatalog`] if the request fails.
    pub async fn search(&self, query: &SearchQuery) -> Result<String> {
        let body = SearchRequest::new(query, self.config.source_id.as_deref());
        let body = encode_message(self.codec.as_ref(), &body)?;
        let request = self.prepare(Method::Post, &self.source_url, BTreeMap::new(), Some(body))?;

        let response = self
            .send(&request)
            .await
            .and_then(|r| r.error_for_status(&request))
            .map_err(|e| e.context("Failed search query"))?;
        let reply: SearchResponse = decode_message(self.codec.as_ref(), &response.body)
            .map_err(|e| e.context("Failed search query"))?;
        Ok(reply.source_id)
    }

    /// Asks the server to open entry `name` with resolved `parameters`.
    ///
    /// Returns the raw response record.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Server`] on any non-2xx status and
    /// [`RemoteError::RemoteCatalog`] naming the entry if the request cannot
    /// be sent or its answer cannot be decoded.
    pub async fn open(
        &self,
        name: &str,
        parameters: &Map<String, Value>,
        available_plugins: Vec<&str>,
    ) -> Result<Map<String, Value>> {
        let body = OpenRequest::new(name, parameters, available_plugins);
        let body = encode_message(self.codec.as_ref(), &body)?;
        let request = self.prepare(Method::Post, &self.source_url, BTreeMap::new(), Some(body))?;

        let context = || format!("Failed to open entry {name:?}");

        let response = self.send(&request).await.map_err(|e| e.context(context()))?;
        if !response.is_success() {
            return Err(RemoteError::Server {
                status: response.status,
                reason: response.reason,
            });
        }

        match self.codec.decode(&response.body).map_err(|e| e.context(context()))? {
            Value::Object(record) => Ok(record),
            other => Err(RemoteError::InvalidResponse {
                message: format!("open response for {name:?} is not a record: {other}"),
            }),
        }
    }

    pub(crate) fn entries_from(self: &Arc<Self>, records: Vec<EntryRecord>) -> Page {
        records
            .into_iter()
            .map(|record| (record.name.clone(), RemoteEntry::new(record, Arc::clone(self))))
            .collect()
    }

    /// Builds a request carrying the configured headers and parameters, the
    /// auth headers and, for scoped catalogs, the scope header.
    fn prepare(
        &self,
        method: Method,
        url: &Url,
        params: BTreeMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpRequest> {
        let mut headers = self.config.headers.clone();
        headers.extend(self.config.auth.headers()?);
        if let Some(source_id) = &self.config.source_id {
            headers.insert(SOURCE_ID_HEADER.to_string(), source_id.clone());
        }
        if body.is_some() {
            headers.insert(
                "Content-Type".to_string(),
                self.codec.content_type().to_string(),
            );
        }

        let mut merged = self.config.params.clone();
        merged.extend(params);

        Ok(HttpRequest {
            method,
            url: url.clone(),
            headers,
            params: merged,
            body,
        })
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.transport.request(request.clone()).await
    }
}
