//! Error types for remote catalog operations.

use quarry_core::CoreError;
use thiserror::Error;

/// Result type alias using [`RemoteError`] as the error type.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors that can occur while talking to a catalog server.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server answered with a non-2xx status.
    #[error("{method} {url} returned {status} {reason}")]
    Transport {
        /// HTTP method of the failed request.
        method: String,
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Reason phrase for the status.
        reason: String,
    },

    /// A catalog operation failed; `source` holds the underlying failure.
    #[error("{context}: {source}")]
    RemoteCatalog {
        /// Which operation failed, and on what.
        context: String,
        /// Underlying error.
        #[source]
        source: Box<RemoteError>,
    },

    /// No entry with this name exists in the catalog.
    #[error("Entry not found: {name}")]
    NotFound {
        /// Entry name.
        name: String,
    },

    /// The server refused access to the catalog.
    #[error("Authentication failed: {message}")]
    AuthenticationFailure {
        /// Message suitable for the end user.
        message: String,
    },

    /// The server failed to open an entry.
    #[error("Server error: {status}, {reason}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Reason phrase for the status.
        reason: String,
    },

    /// Failed to reach the server at all.
    #[error("Failed to connect to catalog at {url}: {source}")]
    ConnectionFailed {
        /// Server URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be built or its response body not read.
    #[error("HTTP request failed: {source}")]
    Http {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// A payload could not be encoded or decoded.
    #[error("Codec error: {message}")]
    Codec {
        /// Error message.
        message: String,
    },

    /// A payload decoded but does not have the expected shape.
    #[error("Invalid response from server: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },

    /// Invalid URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },

    /// Invalid configuration value, such as a header that cannot be sent.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// A resolved proxy cannot be used as the requested container.
    #[error("Source '{name}' has container '{container}', not a catalog")]
    UnsupportedContainer {
        /// Entry name.
        name: String,
        /// Container reported by the server.
        container: String,
    },

    /// A user parameter could not be prepared.
    #[error(transparent)]
    Parameter(#[from] CoreError),
}

impl RemoteError {
    /// Wraps `self` with operation context.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::RemoteCatalog {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns true if this error means the requested entry does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the HTTP status behind this error, looking through context.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::RemoteCatalog { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if let Some(status) = err.status() {
            Self::Transport {
                method: String::new(),
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            }
        } else {
            Self::Http { source: err }
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for RemoteError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forbidden() -> RemoteError {
        RemoteError::Transport {
            method: "GET".to_string(),
            url: "http://localhost:5000/v1/info".to_string(),
            status: 403,
            reason: "Forbidden".to_string(),
        }
    }

    #[test]
    fn test_error_display_transport() {
        assert_eq!(
            forbidden().to_string(),
            "GET http://localhost:5000/v1/info returned 403 Forbidden"
        );
    }

    #[test]
    fn test_context_keeps_source() {
        let err = forbidden().context("Failed to fetch metadata");
        assert!(err.to_string().starts_with("Failed to fetch metadata: GET"));
        assert_eq!(err.status(), Some(403));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_display_not_found() {
        let err = RemoteError::NotFound {
            name: "z".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Entry not found: z");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_error_display_server() {
        let err = RemoteError::Server {
            status: 500,
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(err.to_string(), "Server error: 500, Internal Server Error");
    }

    #[test]
    fn test_request_build_failure_is_http_error() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        let err = RemoteError::from(err);
        assert!(matches!(err, RemoteError::Http { .. }));
        assert!(err.to_string().starts_with("HTTP request failed"));
    }
}
