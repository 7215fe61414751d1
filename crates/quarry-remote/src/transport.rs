//! HTTP transport used by catalogs and entries.
//!
//! [`Transport`] is the seam between the catalog protocol and the network.
//! [`HttpTransport`] is the reqwest-backed implementation; tests substitute
//! an in-memory server.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::config::CatalogConfig;
use crate::error::{RemoteError, Result};

/// HTTP methods used by the catalog protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET request.
    Get,
    /// POST request.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// A fully prepared request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Target URL, without query parameters.
    pub url: Url,
    /// Headers, already merged with auth and scope headers.
    pub headers: BTreeMap<String, String>,
    /// Query parameters.
    pub params: BTreeMap<String, String>,
    /// Encoded body, for POST.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            body: None,
        }
    }

    /// Returns the value of a query parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns the value of a header, matching the name case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A completed exchange, whatever its status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase for the status.
    pub reason: String,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with the canonical reason for `status`.
    #[must_use]
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            reason,
            body,
        }
    }

    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Turns a non-2xx response into [`RemoteError::Transport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the status is not 2xx.
    pub fn error_for_status(self, request: &HttpRequest) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(RemoteError::Transport {
                method: request.method.to_string(),
                url: request.url.to_string(),
                status: self.status,
                reason: self.reason,
            })
        }
    }
}

/// Sends requests to a catalog server.
///
/// Implementations return every completed exchange as an [`HttpResponse`],
/// including error statuses; only failures to complete the exchange are
/// errors.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    /// Sends `request` and returns the server's response.
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Transport over HTTP(S) using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport from the timeout, user agent and TLS settings of
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if certificates cannot be read or the client cannot
    /// be built.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if let Some(ref tls) = config.tls {
            if tls.insecure_skip_verify {
                builder = builder.danger_accept_invalid_certs(true);
            }

            if let Some(ref ca_cert) = tls.ca_cert {
                let cert_pem = std::fs::read(ca_cert).map_err(|e| RemoteError::InvalidConfig {
                    message: format!("Cannot read CA certificate {}: {e}", ca_cert.display()),
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem).map_err(|e| {
                    RemoteError::InvalidConfig {
                        message: format!("Invalid CA certificate: {e}"),
                    }
                })?;
                builder = builder.add_root_certificate(cert);
            }

            if let (Some(ref cert_path), Some(ref key_path)) = (&tls.client_cert, &tls.client_key)
            {
                let read = |path: &std::path::Path| {
                    std::fs::read(path).map_err(|e| RemoteError::InvalidConfig {
                        message: format!("Cannot read {}: {e}", path.display()),
                    })
                };
                let mut pem = read(cert_path)?;
                pem.extend_from_slice(&read(key_path)?);

                let identity =
                    reqwest::Identity::from_pem(&pem).map_err(|e| RemoteError::InvalidConfig {
                        message: format!("Invalid client certificate: {e}"),
                    })?;
                builder = builder.identity(identity);
            }
        }

        let http = builder.build().map_err(|e| RemoteError::InvalidConfig {
            message: format!("Cannot build HTTP client for {}: {e}", config.url),
        })?;
        Ok(Self { http })
    }

    fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| RemoteError::InvalidConfig {
                    message: format!("Invalid header name: {name}"),
                })?;
            let value = HeaderValue::from_str(value).map_err(|_| RemoteError::InvalidConfig {
                message: format!("Invalid value for header {name}"),
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let builder = match request.method {
            Method::Get => self.http.get(request.url.clone()),
            Method::Post => self.http.post(request.url.clone()),
        };
        let mut builder = builder
            .headers(Self::header_map(&request.headers)?)
            .query(&request.params);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://localhost:5000/v1/info").unwrap()
    }

    #[test]
    fn test_transport_creation() {
        let config = CatalogConfig::new("quarry://localhost:5000");
        assert!(HttpTransport::new(&config).is_ok());
    }

    #[test]
    fn test_response_reason_from_status() {
        let response = HttpResponse::new(404, Vec::new());
        assert_eq!(response.reason, "Not Found");
        assert!(!response.is_success());
    }

    #[test]
    fn test_error_for_status() {
        let request = HttpRequest::get(url());
        let err = HttpResponse::new(503, Vec::new())
            .error_for_status(&request)
            .unwrap_err();
        assert!(matches!(
            err,
            RemoteError::Transport { status: 503, ref method, .. } if method == "GET"
        ));
        assert!(HttpResponse::new(200, Vec::new())
            .error_for_status(&request)
            .is_ok());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut request = HttpRequest::get(url());
        request.headers.insert("Source-Id".to_string(), "abc".to_string());
        assert_eq!(request.header("source-id"), Some("abc"));
    }

    #[test]
    fn test_header_map_rejects_bad_names() {
        let headers = BTreeMap::from([("bad header".to_string(), "x".to_string())]);
        assert!(HttpTransport::header_map(&headers).is_err());
    }
}
