//! Header providers used to authenticate catalog requests.
//!
//! Every request a catalog or entry sends merges the headers returned by its
//! [`ClientAuth`] into the configured headers. How credentials are obtained
//! is up to the implementation.

use std::collections::BTreeMap;
use std::fmt::Debug;

use base64::Engine;

use crate::error::{RemoteError, Result};

/// Produces the authentication headers attached to each request.
pub trait ClientAuth: Debug + Send + Sync {
    /// Returns the headers to add to the next request.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials cannot be rendered as headers.
    fn headers(&self) -> Result<BTreeMap<String, String>>;
}

/// Adds no headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl ClientAuth for NoAuth {
    fn headers(&self) -> Result<BTreeMap<String, String>> {
        Ok(BTreeMap::new())
    }
}

/// Credentials known up front.
#[derive(Debug, Clone)]
pub enum StaticAuth {
    /// Basic authentication (username/password).
    Basic {
        /// Username.
        username: String,
        /// Password or token.
        password: String,
    },

    /// Bearer token authentication.
    Bearer {
        /// Token value.
        token: String,
    },

    /// A shared secret sent in a named header.
    Header {
        /// Header name.
        name: String,
        /// Header value.
        value: String,
    },
}

impl StaticAuth {
    /// Creates basic authentication.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_remote::{ClientAuth, StaticAuth};
    ///
    /// let headers = StaticAuth::basic("user", "pass").headers().unwrap();
    /// assert_eq!(headers["Authorization"], "Basic dXNlcjpwYXNz");
    /// ```
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Sends `value` in header `name`.
    #[must_use]
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Header {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl ClientAuth for StaticAuth {
    fn headers(&self) -> Result<BTreeMap<String, String>> {
        let (name, value) = match self {
            Self::Basic { username, password } => {
                let credentials = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                ("Authorization".to_string(), format!("Basic {credentials}"))
            }
            Self::Bearer { token } => ("Authorization".to_string(), format!("Bearer {token}")),
            Self::Header { name, value } => {
                if name.trim().is_empty() {
                    return Err(RemoteError::AuthenticationFailure {
                        message: "Authentication header name is empty".to_string(),
                    });
                }
                (name.clone(), value.clone())
            }
        };
        Ok(BTreeMap::from([(name, value)]))
    }
}
