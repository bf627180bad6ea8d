//! Base URL resolution and link construction.
//!
//! Every generated link (`Location`, relationship `self`/`related`,
//! pagination) is `{base}/{prefix}/{type}/...`. The base comes from a
//! [`UrlResolver`]: fixed with [`StaticResolver`], or taken from the request
//! with [`RequestHostResolver`].

use http::header::HOST;
use http::HeaderMap;

/// Yields the base URL generated links are rooted at.
pub trait UrlResolver: Send + Sync {
    /// Returns the base URL for a request with the given headers, e.g.
    /// `"http://localhost:31415"` or `"/"`.
    fn base_url(&self, headers: &HeaderMap) -> String;
}

/// A fixed base URL.
///
/// ```rust
/// use hypatia_server::{StaticResolver, UrlResolver};
///
/// let resolver = StaticResolver::new("http://localhost:31415");
/// assert_eq!(resolver.base_url(&Default::default()), "http://localhost:31415");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticResolver {
    base: String,
}

impl StaticResolver {
    /// Creates a resolver that always answers `base`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl Default for StaticResolver {
    /// Host-relative links (`/api/users/1`).
    fn default() -> Self {
        Self::new("/")
    }
}

impl UrlResolver for StaticResolver {
    fn base_url(&self, _headers: &HeaderMap) -> String {
        self.base.clone()
    }
}

/// Derives `scheme://host` from the request.
///
/// The host comes from the `Host` header and the scheme from
/// `X-Forwarded-Proto` if present, else from the configured default.
/// Requests without a `Host` header get host-relative links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHostResolver {
    scheme: String,
}

impl RequestHostResolver {
    /// Creates a resolver using `scheme` unless the request says otherwise.
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }
}

impl Default for RequestHostResolver {
    fn default() -> Self {
        Self::new("http")
    }
}

impl UrlResolver for RequestHostResolver {
    fn base_url(&self, headers: &HeaderMap) -> String {
        let Some(host) = headers.get(HOST).and_then(|h| h.to_str().ok()) else {
            return "/".to_string();
        };
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map_or(self.scheme.as_str(), str::trim);
        format!("{scheme}://{host}")
    }
}

/// Builds links under one resolved root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkBuilder {
    root: String,
}

impl LinkBuilder {
    pub(crate) fn new(base: &str, prefix: &str) -> Self {
        Self {
            root: collapse_slashes(&format!("{base}/{prefix}"))
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub(crate) fn collection(&self, type_name: &str) -> String {
        format!("{}/{type_name}", self.root)
    }

    pub(crate) fn resource(&self, type_name: &str, id: &str) -> String {
        format!("{}/{type_name}/{}", self.root, urlencoding::encode(id))
    }

    pub(crate) fn related(&self, type_name: &str, id: &str, key: &str) -> String {
        format!("{}/{key}", self.resource(type_name, id))
    }

    pub(crate) fn relationship(&self, type_name: &str, id: &str, key: &str) -> String {
        format!("{}/relationships/{key}", self.resource(type_name, id))
    }
}

/// Collapses runs of `/` outside a leading `scheme://`.
fn collapse_slashes(url: &str) -> String {
    let (scheme, rest) = match url.find("://") {
        Some(i) => url.split_at(i + 3),
        None => ("", url),
    };
    let mut out = String::with_capacity(url.len());
    out.push_str(scheme);
    let mut previous_slash = false;
    for c in rest.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        out.push(c);
    }
    out
}
