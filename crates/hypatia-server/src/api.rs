//! The API builder and its request handler.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use hypatia_core::{
//!     ApiError, Capabilities, Collection, Field, FieldSet, Model, RequestContext, Resource,
//! };
//! use hypatia_server::{Api, ApiConfig};
//!
//! #[derive(Default, Clone)]
//! struct Planet {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Model for Planet {
//!     const TYPE: &'static str = "planets";
//!     fn id(&self) -> String { self.id.clone() }
//!     fn set_id(&mut self, id: String) { self.id = id; }
//!     fn fields() -> FieldSet<Self> {
//!         FieldSet::<Self>::new().with(Field::<Self>::attribute("name", |p| &p.name, |p| &mut p.name))
//!     }
//! }
//!
//! struct Planets;
//!
//! #[async_trait]
//! impl Resource for Planets {
//!     type Model = Planet;
//!
//!     async fn find_all(&self, _ctx: &RequestContext) -> Result<Collection<Planet>, ApiError> {
//!         Ok(Collection::full(Vec::new()))
//!     }
//!
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities { find_all: true, ..Capabilities::NONE }
//!     }
//! }
//!
//! let mut api = Api::new(ApiConfig::builder().prefix("v1").build()).unwrap();
//! api.add_resource(Planets).unwrap();
//! assert_eq!(api.routes().len(), 7);
//! assert_eq!(api.routes()[0].path, "/v1/planets");
//!
//! let handler = api.into_handler();
//! # drop(handler);
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::Request;
use hyper::body::Body;
use hypatia_core::{QueryParser, Registry, RegistryError, Resource};
use hypatia_router::{RadixRouter, Routeable};

use crate::config::ApiConfig;
use crate::dispatch::Dispatcher;
use crate::fallback::{FallbackHandler, JsonApiFallback};
use crate::response::HttpResponse;
use crate::routes::{derive_routes, Endpoint, RouteInfo};
use crate::url::{StaticResolver, UrlResolver};

/// Characters a path prefix may not contain.
const FORBIDDEN_PREFIX_CHARS: &[char] = &['{', '}', '?', '#'];

/// A JSON:API under construction.
///
/// Register resources with [`add_resource`](Self::add_resource), then
/// call [`into_handler`](Self::into_handler) to obtain the request handler.
pub struct Api {
    config: ApiConfig,
    registry: Registry,
    router: Box<dyn Routeable<Endpoint>>,
    routes: Vec<RouteInfo>,
    resolver: Arc<dyn UrlResolver>,
    fallback: Arc<dyn FallbackHandler>,
}

impl Api {
    /// Creates an empty API with the radix router, a `/` base URL and
    /// JSON:API error documents for unmatched requests.
    pub fn new(config: ApiConfig) -> Result<Self, RegistryError> {
        if let Some(c) = config.prefix().chars().find(|c| FORBIDDEN_PREFIX_CHARS.contains(c)) {
            return Err(RegistryError::InvalidPrefix {
                prefix: config.prefix().to_string(),
                reason: format!("contains `{c}`"),
            });
        }

        Ok(Self {
            config,
            registry: Registry::new(),
            router: Box::new(RadixRouter::new()),
            routes: Vec::new(),
            resolver: Arc::new(StaticResolver::default()),
            fallback: Arc::new(JsonApiFallback),
        })
    }

    /// Replaces the routing back-end.
    ///
    /// Routes of resources added before the switch move to the new router.
    pub fn with_router(mut self, mut router: Box<dyn Routeable<Endpoint>>) -> Self {
        for route in &self.routes {
            router.register(route.method.clone(), &route.path, route.endpoint.clone());
        }
        self.router = router;
        self
    }

    /// Sets how the base URL of generated links is determined.
    pub fn with_url_resolver(mut self, resolver: impl UrlResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Sets the handler for requests no route matches.
    pub fn with_fallback(mut self, fallback: impl FallbackHandler + 'static) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    /// Registers a resource and derives its routes.
    pub fn add_resource<R: Resource>(&mut self, resource: R) -> Result<(), RegistryError> {
        let type_name = <R::Model as hypatia_core::Model>::TYPE;
        self.registry.register(resource)?;

        let schema = self
            .registry
            .schema(type_name)
            .ok_or_else(|| RegistryError::InvalidTypeName(type_name.to_string()))?;
        let routes = derive_routes(schema, self.config.prefix());
        for route in &routes {
            self.router
                .register(route.method.clone(), &route.path, route.endpoint.clone());
        }

        tracing::info!(
            resource = type_name,
            routes = routes.len(),
            router = self.router.name(),
            "Resource registered"
        );
        self.routes.extend(routes);
        Ok(())
    }

    /// Every route registered so far, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// The resource registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Freezes the API into a cloneable request handler.
    pub fn into_handler(self) -> ApiHandler {
        for (owner, key, related) in self.registry.dangling_relationships() {
            tracing::warn!(
                resource = %owner,
                relationship = %key,
                related = related,
                "Relationship points at an unregistered resource type"
            );
        }

        let query_parser =
            QueryParser::new(self.config.default_page_size(), self.config.max_page_size());
        ApiHandler {
            dispatcher: Arc::new(Dispatcher {
                config: self.config,
                registry: self.registry,
                router: self.router,
                resolver: self.resolver,
                fallback: self.fallback,
                query_parser,
            }),
        }
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("router", &self.router.name())
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}

/// Handles requests for a frozen [`Api`]. Cheap to clone.
#[derive(Clone)]
pub struct ApiHandler {
    dispatcher: Arc<Dispatcher>,
}

impl ApiHandler {
    /// Handles one request. Never fails: errors become error documents.
    pub async fn handle<B>(&self, request: Request<B>) -> HttpResponse
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.dispatcher.handle(request).await
    }
}

impl fmt::Debug for ApiHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiHandler")
            .field("resources", &self.dispatcher.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::{BodyExt, Full};
    use hypatia_core::{ApiError, Capabilities, Collection, Field, FieldSet, Model, RequestContext};
    use hypatia_router::LinearRouter;

    #[derive(Debug, Default, Clone)]
    struct Lamp {
        id: String,
        lit: bool,
    }

    impl Model for Lamp {
        const TYPE: &'static str = "lamps";

        fn id(&self) -> String {
            self.id.clone()
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn fields() -> FieldSet<Self> {
            FieldSet::<Self>::new().with(Field::<Self>::attribute("lit", |l| &l.lit, |l| &mut l.lit))
        }
    }

    struct Lamps;

    #[async_trait]
    impl Resource for Lamps {
        type Model = Lamp;

        async fn find_all(&self, _ctx: &RequestContext) -> Result<Collection<Lamp>, ApiError> {
            Ok(Collection::full(vec![Lamp {
                id: "1".into(),
                lit: true,
            }]))
        }

        async fn find_one(&self, id: &str, _ctx: &RequestContext) -> Result<Lamp, ApiError> {
            match id {
                "1" => Ok(Lamp {
                    id: "1".into(),
                    lit: true,
                }),
                "boom" => panic!("lamp exploded"),
                _ => Err(ApiError::not_found("lamps", id)),
            }
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::READ_ONLY
        }
    }

    fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn json(response: HttpResponse) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let err = Api::new(ApiConfig::builder().prefix("v{1}").build()).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPrefix { .. }));
    }

    #[test]
    fn test_prefix_from_config_file() {
        let config: ApiConfig = serde_json::from_str(r#"{"prefix":"/api/"}"#).unwrap();
        let mut api = Api::new(config).unwrap();
        api.add_resource(Lamps).unwrap();
        assert_eq!(api.routes()[0].path, "/api/lamps");
    }

    #[test]
    fn test_duplicate_resource() {
        let mut api = Api::new(ApiConfig::default()).unwrap();
        api.add_resource(Lamps).unwrap();
        let err = api.add_resource(Lamps).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateType("lamps".into()));
        assert_eq!(api.routes().len(), 7);
    }

    #[tokio::test]
    async fn test_router_swap_keeps_routes() {
        let mut api = Api::new(ApiConfig::builder().prefix("api").build()).unwrap();
        api.add_resource(Lamps).unwrap();
        let handler = api.with_router(Box::new(LinearRouter::new())).into_handler();

        let response = handler.handle(request(Method::GET, "/api/lamps/1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["data"]["attributes"]["lit"], true);
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let mut api = Api::new(ApiConfig::default()).unwrap();
        api.add_resource(Lamps).unwrap();
        let handler = api.into_handler();

        let response = handler.handle(request(Method::GET, "/lamps/boom")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(response).await;
        assert_eq!(body["errors"][0]["status"], "500");

        // The handler keeps serving after a panic.
        let response = handler.handle(request(Method::GET, "/lamps/1")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_options_lists_capabilities() {
        let mut api = Api::new(ApiConfig::default()).unwrap();
        api.add_resource(Lamps).unwrap();
        let handler = api.into_handler();

        let response = handler.handle(request(Method::OPTIONS, "/lamps")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[http::header::ALLOW], "GET, OPTIONS");

        let response = handler.handle(request(Method::OPTIONS, "/lamps/1")).await;
        assert_eq!(response.headers()[http::header::ALLOW], "GET, OPTIONS");
    }
}
