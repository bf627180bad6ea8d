//! The router abstraction the dispatcher programs against.

use http::Method;

use crate::params::Params;

/// Outcome of resolving a request against a router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a, H> {
    /// A route matched both path and method.
    Matched {
        /// The handler registered for the route
        handler: &'a H,
        /// Path parameters captured by the pattern
        params: Params,
    },
    /// The path matched at least one route but none for this method.
    MethodNotAllowed {
        /// Methods registered for the matched path
        allowed: Vec<Method>,
    },
    /// No route matched the path.
    NotFound,
}

impl<'a, H> Resolution<'a, H> {
    /// Returns the matched handler, if any.
    #[must_use]
    pub fn handler(&self) -> Option<&'a H> {
        match self {
            Self::Matched { handler, .. } => Some(handler),
            _ => None,
        }
    }

    /// Returns true if a route matched.
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// A routing back-end.
///
/// Implementations store handlers of type `H` under `(method, pattern)`
/// keys. Patterns use `{name}` for parameters. Registering the same
/// method and pattern twice keeps the first handler.
///
/// Routers are built once during setup and then shared read-only across
/// request tasks, hence the `Send + Sync` bound.
pub trait Routeable<H>: Send + Sync {
    /// Registers `handler` for `method` requests matching `pattern`.
    fn register(&mut self, method: Method, pattern: &str, handler: H);

    /// Resolves a request method and path.
    fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, H>;

    /// Short back-end name, used in startup logs.
    fn name(&self) -> &'static str;
}
