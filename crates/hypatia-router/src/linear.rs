//! Ordered-list back-end.
//!
//! Routes are kept in registration order and tried one after another.
//! Slower than the radix tree for large route tables but trivially
//! predictable: the first registered pattern that fits the path wins.

use http::Method;

use crate::params::Params;
use crate::routeable::{Resolution, Routeable};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Route<H> {
    method: Method,
    segments: Vec<PathSegment>,
    handler: H,
}

impl<H> Route<H> {
    fn new(method: Method, pattern: &str, handler: H) -> Self {
        let segments = crate::segments(pattern)
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => PathSegment::Param(name.to_string()),
                None => PathSegment::Literal(s.to_string()),
            })
            .collect();
        Self {
            method,
            segments,
            handler,
        }
    }

    fn match_path(&self, path: &[&str]) -> Option<Params> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (pattern, actual) in self.segments.iter().zip(path) {
            match pattern {
                PathSegment::Literal(expected) if expected == actual => {}
                PathSegment::Literal(_) => return None,
                PathSegment::Param(name) => params.push(name.clone(), *actual),
            }
        }
        Some(params)
    }
}

/// A router that scans its routes in registration order.
///
/// # Example
///
/// ```rust
/// use hypatia_router::{LinearRouter, Resolution, Routeable};
/// use http::Method;
///
/// let mut router = LinearRouter::new();
/// router.register(Method::GET, "/api/users/{id}", "findOne");
///
/// assert!(router.resolve(&Method::GET, "/api/users/1").is_matched());
/// assert_eq!(router.resolve(&Method::GET, "/api/users"), Resolution::NotFound);
/// ```
#[derive(Debug, Clone)]
pub struct LinearRouter<H> {
    routes: Vec<Route<H>>,
}

impl<H> Default for LinearRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> LinearRouter<H> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H: Send + Sync> Routeable<H> for LinearRouter<H> {
    fn register(&mut self, method: Method, pattern: &str, handler: H) {
        let route = Route::new(method, pattern, handler);
        let duplicate = self
            .routes
            .iter()
            .any(|r| r.method == route.method && r.segments == route.segments);
        if !duplicate {
            self.routes.push(route);
        }
    }

    fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, H> {
        let path: Vec<&str> = crate::segments(path).collect();
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            if let Some(params) = route.match_path(&path) {
                if route.method == *method {
                    return Resolution::Matched {
                        handler: &route.handler,
                        params,
                    };
                }
                if !allowed.contains(&route.method) {
                    allowed.push(route.method.clone());
                }
            }
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}
