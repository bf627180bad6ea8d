//! Per-path method table.

use http::Method;

/// Maps HTTP methods to handlers for a single path.
///
/// Only the methods a JSON:API server can meaningfully answer get a slot.
/// Registering an extension method is a no-op.
///
/// # Example
///
/// ```rust
/// use hypatia_router::MethodRouter;
/// use http::Method;
///
/// let mut methods = MethodRouter::new();
/// methods.insert(&Method::GET, "findOne");
/// methods.insert(&Method::PATCH, "update");
///
/// assert_eq!(methods.get(&Method::GET), Some(&"findOne"));
/// assert_eq!(methods.get(&Method::DELETE), None);
/// assert_eq!(methods.allowed_methods(), vec![Method::GET, Method::PATCH]);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<H> {
    get: Option<H>,
    head: Option<H>,
    post: Option<H>,
    put: Option<H>,
    patch: Option<H>,
    delete: Option<H>,
    options: Option<H>,
}

impl<H> Default for MethodRouter<H> {
    fn default() -> Self {
        Self {
            get: None,
            head: None,
            post: None,
            put: None,
            patch: None,
            delete: None,
            options: None,
        }
    }
}

impl<H> MethodRouter<H> {
    /// Creates an empty method table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding a single handler.
    #[must_use]
    pub fn with(method: &Method, handler: H) -> Self {
        let mut router = Self::new();
        router.insert(method, handler);
        router
    }

    fn slot(&self, method: &Method) -> Option<&Option<H>> {
        match *method {
            Method::GET => Some(&self.get),
            Method::HEAD => Some(&self.head),
            Method::POST => Some(&self.post),
            Method::PUT => Some(&self.put),
            Method::PATCH => Some(&self.patch),
            Method::DELETE => Some(&self.delete),
            Method::OPTIONS => Some(&self.options),
            _ => None,
        }
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<H>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::HEAD => Some(&mut self.head),
            Method::POST => Some(&mut self.post),
            Method::PUT => Some(&mut self.put),
            Method::PATCH => Some(&mut self.patch),
            Method::DELETE => Some(&mut self.delete),
            Method::OPTIONS => Some(&mut self.options),
            _ => None,
        }
    }

    /// Stores `handler` for `method` unless one is already registered.
    ///
    /// Returns false if the slot was taken or the method is unsupported.
    pub fn insert(&mut self, method: &Method, handler: H) -> bool {
        match self.slot_mut(method) {
            Some(slot) if slot.is_none() => {
                *slot = Some(handler);
                true
            }
            _ => false,
        }
    }

    /// Returns the handler registered for `method`.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&H> {
        self.slot(method).and_then(Option::as_ref)
    }

    /// Merges another table into this one.
    ///
    /// Slots already filled here are kept.
    pub fn merge(&mut self, other: MethodRouter<H>) {
        let MethodRouter {
            get,
            head,
            post,
            put,
            patch,
            delete,
            options,
        } = other;
        for (method, handler) in [
            (Method::GET, get),
            (Method::HEAD, head),
            (Method::POST, post),
            (Method::PUT, put),
            (Method::PATCH, patch),
            (Method::DELETE, delete),
            (Method::OPTIONS, options),
        ] {
            if let Some(handler) = handler {
                self.insert(&method, handler);
            }
        }
    }

    /// Returns true if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed_methods().is_empty()
    }

    /// Lists registered methods in a stable order suitable for an
    /// `Allow` header.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        [
            (Method::GET, self.get.is_some()),
            (Method::HEAD, self.head.is_some()),
            (Method::POST, self.post.is_some()),
            (Method::PUT, self.put.is_some()),
            (Method::PATCH, self.patch.is_some()),
            (Method::DELETE, self.delete.is_some()),
            (Method::OPTIONS, self.options.is_some()),
        ]
        .into_iter()
        .filter_map(|(method, present)| present.then_some(method))
        .collect()
    }
}
