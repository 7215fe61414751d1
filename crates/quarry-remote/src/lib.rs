//! # Quarry Remote
//!
//! Client for catalogs served by a remote Quarry server.
//!
//! A catalog may hold many thousands of entries. This crate fetches them
//! lazily, a page at a time when the server supports it, caches them
//! without losing server order, and resolves entries into sources the
//! client either builds itself or keeps reading through the server.
//!
//! ## Features
//!
//! - **Paginated listing**: restartable iteration that resumes where the
//!   last walk stopped and never refetches a page
//! - **Point lookups**: entries fetched by name without disturbing listing
//!   order
//! - **Legacy servers**: servers without pagination are detected on load
//! - **Search**: server-side queries yield new, scoped catalogs
//! - **Resolution**: entries open as direct or proxied sources
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry_remote::{CatalogConfig, PluginRegistry, RemoteCatalog, ResolvedSource, StaticAuth};
//! use serde_json::Map;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CatalogConfig::new("quarry://localhost:5000")
//!         .with_auth(StaticAuth::bearer("token"))
//!         .with_page_size(100);
//!     let mut catalog = RemoteCatalog::connect(config).await?;
//!
//!     let entry = catalog.get("trips").await?;
//!     let plugins = PluginRegistry::new().with_plugin("csv");
//!     match entry.get(Map::new(), &plugins).await? {
//!         ResolvedSource::Direct(source) => println!("read with {}", source.plugin),
//!         ResolvedSource::Proxy(source) => println!("proxied as {:?}", source.source_id()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     RemoteCatalog                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐  │
//! │  │  EntryCache  │  │ CatalogClient│  │  RemoteEntry   │  │
//! │  │ (page/direct)│  │  (protocol)  │  │  (resolution)  │  │
//! │  └──────────────┘  └──────────────┘  └────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//!                   │                  │
//!                   ▼                  ▼
//!           ┌──────────────┐   ┌──────────────┐
//!           │  Transport   │   │  EntryCodec  │
//!           │  (reqwest)   │   │   (JSON)     │
//!           └──────────────┘   └──────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod auth;
mod cache;
mod catalog;
mod client;
mod codec;
mod config;
mod entry;
mod error;
mod resolve;
mod transport;
mod wire;

#[cfg(test)]
mod proptest_tests;
#[cfg(test)]
mod testing;

pub use auth::{ClientAuth, NoAuth, StaticAuth};
pub use cache::{EntryCache, EntryCursor, EntrySource, Pagination};
pub use catalog::RemoteCatalog;
pub use client::{CatalogClient, Page};
pub use codec::{decode_message, encode_message, EntryCodec, JsonCodec};
pub use config::{CatalogConfig, TlsConfig, QUARRY_SCHEME};
pub use entry::{DirectAccess, EntryRecord, RemoteEntry};
pub use error::{RemoteError, Result};
pub use resolve::{DirectSource, PluginRegistry, ProxySource, ResolvedSource, CATALOG_CONTAINER};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};
pub use wire::{
    InfoResponse, OpenRequest, SearchQuery, SearchRequest, SearchResponse, SourceResponse,
    PAGE_OFFSET_PARAM, PAGE_SIZE_PARAM, SOURCE_ID_HEADER,
};
