//! Radix tree back-end.

use http::Method;

use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::routeable::{Resolution, Routeable};

/// A radix tree router.
///
/// Lookup walks one node per path segment. When several patterns could
/// match, static segments win over parameters, which win over catch-alls,
/// so `/api/users/me` beats `/api/users/{id}` regardless of registration
/// order.
///
/// # Example
///
/// ```rust
/// use hypatia_router::{RadixRouter, Routeable};
/// use http::Method;
///
/// let mut router = RadixRouter::new();
/// router.register(Method::GET, "/api/chocolates/{id}", 1_u32);
///
/// let resolution = router.resolve(&Method::GET, "/api/chocolates/3");
/// assert_eq!(resolution.handler(), Some(&1));
/// ```
#[derive(Debug, Clone)]
pub struct RadixRouter<H> {
    root: Node<H>,
    route_count: usize,
}

impl<H> Default for RadixRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RadixRouter<H> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
        }
    }

    /// Number of `register` calls made so far.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.route_count
    }
}

impl<H: Send + Sync> Routeable<H> for RadixRouter<H> {
    fn register(&mut self, method: Method, pattern: &str, handler: H) {
        self.root.insert(pattern, MethodRouter::with(&method, handler));
        self.route_count += 1;
    }

    fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, H> {
        match self.root.match_path(path) {
            Some((methods, params)) => match methods.get(method) {
                Some(handler) => Resolution::Matched { handler, params },
                None => Resolution::MethodNotAllowed {
                    allowed: methods.allowed_methods(),
                },
            },
            None => Resolution::NotFound,
        }
    }

    fn name(&self) -> &'static str {
        "radix"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> RadixRouter<&'static str> {
        let mut router = RadixRouter::new();
        router.register(Method::GET, "/api/users", "findAll");
        router.register(Method::POST, "/api/users", "create");
        router.register(Method::GET, "/api/users/{id}", "findOne");
        router.register(Method::PATCH, "/api/users/{id}", "update");
        router.register(Method::DELETE, "/api/users/{id}", "delete");
        router.register(Method::GET, "/api/users/{id}/sweets", "related");
        router
    }

    #[test]
    fn test_resolve_matched() {
        let router = fixture();
        match router.resolve(&Method::PATCH, "/api/users/9") {
            Resolution::Matched { handler, params } => {
                assert_eq!(*handler, "update");
                assert_eq!(params.get("id"), Some("9"));
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_method_not_allowed() {
        let router = fixture();
        assert_eq!(
            router.resolve(&Method::DELETE, "/api/users"),
            Resolution::MethodNotAllowed {
                allowed: vec![Method::GET, Method::POST]
            }
        );
    }

    #[test]
    fn test_resolve_not_found() {
        let router = fixture();
        assert_eq!(
            router.resolve(&Method::GET, "/api/users/9/unknown"),
            Resolution::NotFound
        );
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let router = fixture();
        assert!(router.resolve(&Method::GET, "/api/users/").is_matched());
    }

    #[test]
    fn test_route_count() {
        assert_eq!(fixture().route_count(), 6);
    }
}
