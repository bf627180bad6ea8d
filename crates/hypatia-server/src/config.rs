//! API and server configuration.
//!
//! Both types use the builder pattern and derive `Deserialize`, so an
//! embedding application can construct them in code or load them from
//! whatever configuration source it already has.
//!
//! # Example
//!
//! ```rust
//! use hypatia_server::{ApiConfig, ServerConfig};
//! use std::time::Duration;
//!
//! let api = ApiConfig::builder()
//!     .prefix("api")
//!     .max_page_size(Some(100))
//!     .build();
//! assert_eq!(api.prefix(), "api");
//!
//! let server = ServerConfig::builder()
//!     .http_addr("127.0.0.1:31415")
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .build();
//! assert_eq!(server.http_addr(), "127.0.0.1:31415");
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

/// Default upper bound on request bodies: 1 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default `page[size]` when only `page[number]` is given.
pub const DEFAULT_PAGE_SIZE: usize = hypatia_core::DEFAULT_PAGE_SIZE;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// JSON:API behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Path prefix every route is mounted under, without slashes
    #[serde(deserialize_with = "trimmed_prefix")]
    prefix: String,

    /// Largest accepted request body in bytes
    max_body_size: usize,

    /// `page[size]` / `page[limit]` applied when only the position is given
    default_page_size: usize,

    /// Largest accepted page size, if any
    max_page_size: Option<usize>,
}

impl ApiConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ApiConfigBuilder {
        ApiConfigBuilder::default()
    }

    /// Returns the route prefix, without leading or trailing slashes.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the body size limit in bytes.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Returns the default page size.
    #[must_use]
    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    /// Returns the page size cap.
    #[must_use]
    pub fn max_page_size(&self) -> Option<usize> {
        self.max_page_size
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ApiConfig`].
#[derive(Debug, Clone)]
pub struct ApiConfigBuilder {
    prefix: String,
    max_body_size: usize,
    default_page_size: usize,
    max_page_size: Option<usize>,
}

impl ApiConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: None,
        }
    }

    /// Sets the route prefix, e.g. `"api"` or `"/v1/api/"`.
    ///
    /// Leading and trailing slashes are stripped.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the request body limit in bytes.
    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Sets the default page size.
    #[must_use]
    pub fn default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Sets the page size cap.
    #[must_use]
    pub fn max_page_size(mut self, max: Option<usize>) -> Self {
        self.max_page_size = max;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ApiConfig {
        ApiConfig {
            prefix: trim_prefix(&self.prefix),
            max_body_size: self.max_body_size,
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

impl Default for ApiConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings for the standalone HTTP [`Server`](crate::Server).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g. `"0.0.0.0:8080"`)
    http_addr: String,

    /// How long to wait for open connections during shutdown
    #[serde(with = "secs")]
    shutdown_timeout: Duration,

    /// Upper bound on handling one request
    #[serde(with = "secs")]
    request_timeout: Duration,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
}

impl ServerConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    ///
    /// This is the longest the server waits for open connections to finish
    /// once shutdown has been triggered.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_prefix(prefix: &str) -> String {
    prefix.trim_matches('/').to_string()
}

fn trimmed_prefix<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|prefix| trim_prefix(&prefix))
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
