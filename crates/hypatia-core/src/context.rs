//! Request context types.
//!
//! A [`RequestContext`] is built once per request after the query string
//! has been parsed, then handed by reference to every resource call made
//! while serving that request. It is never mutated afterwards.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pagination::Pagination;
use crate::query::{IncludePath, Query, SortField};

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps ids sortable in log storage.
///
/// # Example
///
/// ```
/// use hypatia_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID, e.g. one propagated in a request header.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request state passed to resource implementations.
///
/// Carries the request id and everything the query string said about
/// pagination, sparse fieldsets, includes, sorting and filtering.
/// Resources are free to honour or ignore any of it; the dispatcher
/// applies pagination and fieldsets itself when the resource does not.
///
/// # Example
///
/// ```
/// use hypatia_core::{QueryParser, RequestContext, RequestId};
///
/// let query = QueryParser::default()
///     .parse("filter[taste]=bitter&sort=-name")
///     .unwrap();
/// let ctx = RequestContext::new(RequestId::new(), query);
///
/// assert_eq!(ctx.filter("taste"), Some("bitter"));
/// assert!(ctx.sort()[0].descending);
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    query: Query,
    operation_id: Option<String>,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context from a parsed query.
    #[must_use]
    pub fn new(request_id: RequestId, query: Query) -> Self {
        Self {
            request_id,
            query,
            operation_id: None,
            started_at: Instant::now(),
        }
    }

    /// Creates an empty context for tests and internal lookups.
    #[must_use]
    pub fn mock() -> Self {
        Self::new(RequestId::new(), Query::default())
    }

    /// Returns a context tagged with the operation being served.
    #[must_use]
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Returns the request id.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the operation being served, e.g. `users.find_all`.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Returns the full parsed query.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Returns the requested pagination, if any.
    #[must_use]
    pub const fn pagination(&self) -> Option<&Pagination> {
        self.query.pagination.as_ref()
    }

    /// Returns the sparse fieldset requested for `type_name`.
    ///
    /// `None` means "all fields"; `Some(&[])` means "no attributes".
    #[must_use]
    pub fn fields_for(&self, type_name: &str) -> Option<&[String]> {
        self.query.fields.get(type_name).map(Vec::as_slice)
    }

    /// Returns the requested include paths.
    #[must_use]
    pub fn include(&self) -> &[IncludePath] {
        &self.query.include
    }

    /// Returns the requested sort order.
    #[must_use]
    pub fn sort(&self) -> &[SortField] {
        &self.query.sort
    }

    /// Returns the value of `filter[name]`.
    #[must_use]
    pub fn filter(&self, name: &str) -> Option<&str> {
        self.query.filters.get(name).map(String::as_str)
    }

    /// Returns every raw query pair in request order.
    #[must_use]
    pub fn raw_params(&self) -> &[(String, String)] {
        &self.query.raw
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}
