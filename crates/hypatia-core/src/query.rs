//! Query string parsing.
//!
//! [`QueryParser::parse`] turns a raw query string into a [`Query`]. It is
//! pure and total: any input either parses or yields an
//! [`ApiError::InvalidQuery`] (aggregated when several parameters are bad).
//!
//! Recognised parameters:
//!
//! | Parameter | Meaning |
//! |---|---|
//! | `page[offset]`, `page[limit]` | offset pagination |
//! | `page[number]`, `page[size]` | page-number pagination |
//! | `fields[TYPE]=a,b` | sparse fieldset for `TYPE` |
//! | `include=a,b.c` | relationship paths to include |
//! | `sort=a,-b` | sort fields, `-` for descending |
//! | `filter[NAME]=v` | opaque filters for the resource |
//!
//! Anything else is kept verbatim in [`Query::raw`] only. When a parameter
//! is repeated the last occurrence wins.

use std::fmt;

use indexmap::IndexMap;

use crate::error::ApiError;
use crate::pagination::Pagination;

/// Page size used when `page[number]` or `page[offset]` arrives alone.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    /// Field name as sent by the client
    pub field: String,
    /// True for a leading `-`
    pub descending: bool,
}

/// A dot-separated relationship path from `include`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IncludePath(Vec<String>);

impl IncludePath {
    /// Returns the relationship names along the path.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the first relationship and the remaining path.
    #[must_use]
    pub fn split_first(&self) -> Option<(&str, &[String])> {
        self.0.split_first().map(|(head, rest)| (head.as_str(), rest))
    }
}

impl fmt::Display for IncludePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for IncludePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A parsed query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Requested pagination
    pub pagination: Option<Pagination>,
    /// Sparse fieldsets by type name
    pub fields: IndexMap<String, Vec<String>>,
    /// Include paths in request order, without duplicates
    pub include: Vec<IncludePath>,
    /// Sort keys in priority order
    pub sort: Vec<SortField>,
    /// `filter[NAME]` values by name
    pub filters: IndexMap<String, String>,
    /// Every decoded pair in request order
    pub raw: Vec<(String, String)>,
}

/// Parses query strings into [`Query`] values.
///
/// # Example
///
/// ```
/// use hypatia_core::{Pagination, QueryParser};
///
/// let query = QueryParser::default()
///     .parse("page[offset]=2&page[limit]=2&include=sweets")
///     .unwrap();
/// assert_eq!(query.pagination, Some(Pagination::Offset { offset: 2, limit: 2 }));
///
/// let err = QueryParser::default().parse("page[offset]=abc").unwrap_err();
/// assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParser {
    default_page_size: usize,
    max_page_size: Option<usize>,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: None,
        }
    }
}

/// Pagination parameters collected before the style is decided.
#[derive(Default)]
struct PageParams {
    offset: Option<usize>,
    limit: Option<usize>,
    number: Option<usize>,
    size: Option<usize>,
}

impl QueryParser {
    /// Creates a parser with the given page-size policy.
    ///
    /// A zero `default_page_size` falls back to [`DEFAULT_PAGE_SIZE`].
    #[must_use]
    pub fn new(default_page_size: usize, max_page_size: Option<usize>) -> Self {
        Self {
            default_page_size: if default_page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                default_page_size
            },
            max_page_size,
        }
    }

    /// Parses a raw (still percent-encoded) query string, without the `?`.
    pub fn parse(&self, raw: &str) -> Result<Query, ApiError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)
            .map_err(|e| ApiError::invalid_query("query", format!("malformed query string: {e}")))?;

        // Last occurrence wins, but keep first-seen order for stable output.
        let mut latest: IndexMap<&str, &str> = IndexMap::new();
        for (key, value) in &pairs {
            latest.insert(key.as_str(), value.as_str());
        }

        let mut query = Query::default();
        let mut errors = Vec::new();
        let mut page = PageParams::default();

        for (&key, &value) in &latest {
            if let Some(inner) = bracketed(key, "page") {
                match inner {
                    Some(name @ ("offset" | "limit" | "number" | "size")) => {
                        match self.parse_count(key, name, value) {
                            Ok(n) => match name {
                                "offset" => page.offset = Some(n),
                                "limit" => page.limit = Some(n),
                                "number" => page.number = Some(n),
                                _ => page.size = Some(n),
                            },
                            Err(e) => errors.push(e),
                        }
                    }
                    _ => errors.push(ApiError::invalid_query(
                        key,
                        format!("unsupported pagination parameter `{key}`"),
                    )),
                }
            } else if let Some(inner) = bracketed(key, "fields") {
                match inner {
                    Some(type_name) => {
                        query
                            .fields
                            .insert(type_name.to_string(), split_list(value).collect());
                    }
                    None => errors.push(ApiError::invalid_query(
                        key,
                        "sparse fieldsets must name a type, as in fields[TYPE]",
                    )),
                }
            } else if let Some(inner) = bracketed(key, "filter") {
                match inner {
                    Some(name) => {
                        query.filters.insert(name.to_string(), value.to_string());
                    }
                    None => errors.push(ApiError::invalid_query(
                        key,
                        "filters must be named, as in filter[NAME]",
                    )),
                }
            } else if key == "include" {
                match parse_include(value) {
                    Ok(include) => query.include = include,
                    Err(e) => errors.push(e),
                }
            } else if key == "sort" {
                match parse_sort(value) {
                    Ok(sort) => query.sort = sort,
                    Err(e) => errors.push(e),
                }
            }
        }

        match self.resolve_pagination(page) {
            Ok(pagination) => query.pagination = pagination,
            Err(e) => errors.push(e),
        }

        if let Some(error) = ApiError::aggregate(errors) {
            return Err(error);
        }

        query.raw = pairs;
        Ok(query)
    }

    fn parse_count(&self, key: &str, name: &str, value: &str) -> Result<usize, ApiError> {
        let n: usize = value.trim().parse().map_err(|_| {
            ApiError::invalid_query(key, format!("`{key}` must be a non-negative integer, got `{value}`"))
        })?;

        if n == 0 && name != "offset" {
            return Err(ApiError::invalid_query(
                key,
                format!("`{key}` must be at least 1"),
            ));
        }
        if matches!(name, "limit" | "size") {
            if let Some(max) = self.max_page_size.filter(|max| n > *max) {
                return Err(ApiError::invalid_query(
                    key,
                    format!("`{key}` must not exceed {max}"),
                ));
            }
        }
        Ok(n)
    }

    fn resolve_pagination(&self, page: PageParams) -> Result<Option<Pagination>, ApiError> {
        let offset_style = page.offset.is_some() || page.limit.is_some();
        let page_style = page.number.is_some() || page.size.is_some();

        let default_size = self
            .max_page_size
            .map_or(self.default_page_size, |max| self.default_page_size.min(max));

        match (offset_style, page_style) {
            (true, true) => Err(ApiError::invalid_query(
                "page",
                "page[offset]/page[limit] cannot be combined with page[number]/page[size]",
            )),
            (true, false) => Ok(Some(Pagination::Offset {
                offset: page.offset.unwrap_or(0),
                limit: page.limit.unwrap_or(default_size),
            })),
            (false, true) => Ok(Some(Pagination::Page {
                number: page.number.unwrap_or(1),
                size: page.size.unwrap_or(default_size),
            })),
            (false, false) => Ok(None),
        }
    }
}

/// Matches `family[inner]`.
///
/// Returns `None` if `key` is not of this family, `Some(None)` if it is but
/// the brackets are missing, empty or unbalanced, `Some(Some(inner))` otherwise.
fn bracketed<'a>(key: &'a str, family: &str) -> Option<Option<&'a str>> {
    let rest = key.strip_prefix(family)?;
    if rest.is_empty() {
        return Some(None);
    }
    let inner = rest.strip_prefix('[')?;
    Some(inner.strip_suffix(']').filter(|s| !s.is_empty() && !s.contains(['[', ']'])))
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_include(value: &str) -> Result<Vec<IncludePath>, ApiError> {
    let mut paths: Vec<IncludePath> = Vec::new();
    for raw in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if raw.split('.').any(str::is_empty) {
            return Err(ApiError::invalid_query(
                "include",
                format!("include path `{raw}` has an empty segment"),
            ));
        }
        let path: IncludePath = raw.split('.').collect();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn parse_sort(value: &str) -> Result<Vec<SortField>, ApiError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|raw| {
            let (field, descending) = match raw.strip_prefix('-') {
                Some(field) => (field, true),
                None => (raw, false),
            };
            if field.is_empty() || field.starts_with('-') {
                return Err(ApiError::invalid_query(
                    "sort",
                    format!("invalid sort field `{raw}`"),
                ));
            }
            Ok(SortField {
                field: field.to_string(),
                descending,
            })
        })
        .collect()
}
