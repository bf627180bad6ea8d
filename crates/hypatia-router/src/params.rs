//! Path parameter storage.
//!
//! Derived JSON:API routes capture a single `id` parameter (relationship
//! names are registered as static segments), so parameters live inline in
//! a small vector and never touch the heap on the hot path.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Parameters captured while matching a route pattern.
///
/// Stored as `(name, value)` pairs in capture order. Values are the raw
/// path segments; percent-decoding is left to the caller.
///
/// # Example
///
/// ```rust
/// use hypatia_router::Params;
///
/// let mut params = Params::new();
/// params.push("id", "42");
///
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.get("relationship"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a captured parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value captured for `name`.
    ///
    /// If a pattern repeats a name the first capture wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of captured parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Drops every capture after the first `len`.
    ///
    /// Used by the radix matcher to undo captures made on a branch that
    /// did not lead to a route.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
