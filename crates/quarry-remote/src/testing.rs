//! In-memory collaborators for unit tests.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::EntrySource;
use crate::client::{CatalogClient, Page};
use crate::codec::JsonCodec;
use crate::config::CatalogConfig;
use crate::entry::{EntryRecord, RemoteEntry};
use crate::error::{RemoteError, Result};
use crate::transport::{HttpRequest, HttpResponse, Transport};

pub const TEST_URL: &str = "http://catalog.test:5000";

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Transport answering from a closure and recording every request.
pub struct FakeTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport").finish_non_exhaustive()
    }
}

impl FakeTransport {
    pub fn new(handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Transport that fails every request with 500.
    pub fn unreachable() -> Arc<Self> {
        Self::new(|_| HttpResponse::new(500, Vec::new()))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}

pub fn json_response(status: u16, body: &Value) -> HttpResponse {
    HttpResponse::new(status, serde_json::to_vec(body).unwrap())
}

pub fn client_with(config: CatalogConfig, transport: Arc<FakeTransport>) -> Arc<CatalogClient> {
    let transport: Arc<dyn Transport> = transport;
    Arc::new(CatalogClient::new(config, transport, Arc::new(JsonCodec)).unwrap())
}

/// Entry source over a fixed list of names.
#[derive(Debug)]
pub struct FakeSource {
    names: Vec<String>,
    client: Arc<CatalogClient>,
    page_requests: Mutex<Vec<(usize, usize)>>,
    name_requests: Mutex<Vec<String>>,
    fail_next_page: Mutex<bool>,
}

impl FakeSource {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(ToString::to_string).collect(),
            client: client_with(CatalogConfig::new(TEST_URL), FakeTransport::unreachable()),
            page_requests: Mutex::new(Vec::new()),
            name_requests: Mutex::new(Vec::new()),
            fail_next_page: Mutex::new(false),
        }
    }

    pub fn page_requests(&self) -> Vec<(usize, usize)> {
        self.page_requests.lock().unwrap().clone()
    }

    pub fn name_requests(&self) -> Vec<String> {
        self.name_requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.page_requests.lock().unwrap().len() + self.name_requests.lock().unwrap().len()
    }

    pub fn fail_next_page(&self) {
        *self.fail_next_page.lock().unwrap() = true;
    }

    pub fn listing(&self, names: &[&str]) -> Page {
        names
            .iter()
            .map(|name| ((*name).to_string(), entry(self, name)))
            .collect()
    }
}

#[async_trait]
impl EntrySource for FakeSource {
    async fn fetch_page(&self, offset: usize, page_size: NonZeroUsize) -> Result<Page> {
        self.page_requests
            .lock()
            .unwrap()
            .push((offset, page_size.get()));

        if std::mem::take(&mut *self.fail_next_page.lock().unwrap()) {
            return Err(RemoteError::Server {
                status: 503,
                reason: "Service Unavailable".to_string(),
            });
        }

        let end = (offset + page_size.get()).min(self.names.len());
        let start = offset.min(end);
        Ok(self.names[start..end]
            .iter()
            .map(|name| (name.clone(), entry(self, name)))
            .collect())
    }

    async fn fetch_by_name(&self, name: &str) -> Result<RemoteEntry> {
        self.name_requests.lock().unwrap().push(name.to_string());
        if self.names.iter().any(|n| n == name) {
            Ok(entry(self, name))
        } else {
            Err(RemoteError::NotFound {
                name: name.to_string(),
            })
        }
    }
}

pub fn entry(source: &FakeSource, name: &str) -> RemoteEntry {
    entry_with(source, EntryRecord::new(name, "dataframe"))
}

pub fn entry_with(source: &FakeSource, record: EntryRecord) -> RemoteEntry {
    RemoteEntry::new(record, Arc::clone(&source.client))
}
