//! Routing layer for Hypatia.
//!
//! The JSON:API dispatcher never talks to a concrete router. It registers
//! `(method, pattern, handler)` triples through the [`Routeable`] trait and
//! asks it to [`resolve`](Routeable::resolve) incoming requests. Two
//! back-ends ship with the crate:
//!
//! - [`RadixRouter`]: a radix tree keyed by path segment, O(k) lookup
//! - [`LinearRouter`]: an ordered list scanned front to back, first match wins
//!
//! Both understand the same pattern syntax:
//!
//! - static segments: `/api/users`
//! - named parameters: `/api/users/{id}`
//! - catch-all tail (radix only): `/assets/*path`
//!
//! # Example
//!
//! ```rust
//! use hypatia_router::{RadixRouter, Resolution, Routeable};
//! use http::Method;
//!
//! let mut router = RadixRouter::new();
//! router.register(Method::GET, "/api/users", "findAll");
//! router.register(Method::GET, "/api/users/{id}", "findOne");
//! router.register(Method::DELETE, "/api/users/{id}", "delete");
//!
//! match router.resolve(&Method::GET, "/api/users/42") {
//!     Resolution::Matched { handler, params } => {
//!         assert_eq!(*handler, "findOne");
//!         assert_eq!(params.get("id"), Some("42"));
//!     }
//!     other => panic!("unexpected resolution: {other:?}"),
//! }
//!
//! // Known path, unknown verb: the router reports what would have worked.
//! match router.resolve(&Method::PUT, "/api/users/42") {
//!     Resolution::MethodNotAllowed { allowed } => {
//!         assert_eq!(allowed, vec![Method::GET, Method::DELETE]);
//!     }
//!     other => panic!("unexpected resolution: {other:?}"),
//! }
//! ```
//!
//! # Tree shape
//!
//! ```text
//!                    (root)
//!                      │
//!                    "api"
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!           "users"      "chocolates"
//!              │               │
//!        ┌─────┴─────┐       (leaf)
//!        │           │      [GET,POST]
//!     (leaf)      "{id}"
//!   [GET,POST]       │
//!                 (leaf)
//!          [GET,PATCH,DELETE]
//! ```

mod linear;
mod method_router;
mod node;
mod params;
mod radix;
mod routeable;

pub use linear::LinearRouter;
pub use method_router::MethodRouter;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use radix::RadixRouter;
pub use routeable::{Resolution, Routeable};

/// Splits a request path or route pattern into its non-empty segments.
///
/// Leading, trailing and doubled slashes are ignored, so `/api//users/`
/// and `api/users` produce the same segments.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_ignores_empty_parts() {
        let parts: Vec<_> = segments("//api/users//42/").collect();
        assert_eq!(parts, vec!["api", "users", "42"]);
    }

    #[test]
    fn test_backends_agree_on_fixture_routes() {
        let patterns = [
            (http::Method::GET, "/api/users"),
            (http::Method::POST, "/api/users"),
            (http::Method::GET, "/api/users/{id}"),
            (http::Method::PATCH, "/api/users/{id}"),
            (http::Method::GET, "/api/users/{id}/sweets"),
            (http::Method::GET, "/api/users/{id}/relationships/sweets"),
        ];

        let mut radix = RadixRouter::new();
        let mut linear = LinearRouter::new();
        for (i, (method, pattern)) in patterns.iter().enumerate() {
            radix.register(method.clone(), pattern, i);
            linear.register(method.clone(), pattern, i);
        }

        for path in [
            "/api/users",
            "/api/users/1",
            "/api/users/1/sweets",
            "/api/users/1/relationships/sweets",
        ] {
            let r = radix.resolve(&http::Method::GET, path);
            let l = linear.resolve(&http::Method::GET, path);
            assert_eq!(r, l, "back-ends disagree on {path}");
        }

        assert_eq!(
            radix.resolve(&http::Method::GET, "/api/nope"),
            linear.resolve(&http::Method::GET, "/api/nope")
        );
        assert_eq!(
            radix.resolve(&http::Method::DELETE, "/api/users"),
            linear.resolve(&http::Method::DELETE, "/api/users")
        );
    }
}
