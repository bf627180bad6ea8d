//! # Hypatia
//!
//! **A JSON:API server framework**
//!
//! Describe a model's fields once, implement the [`Resource`](prelude::Resource)
//! operations it supports, and Hypatia serves the complete JSON:API surface
//! for it:
//!
//! - **Routing** – collection, resource, related and relationship endpoints
//!   derived per resource type, on a radix or linear router
//! - **Documents** – encoding and validated decoding of resource objects,
//!   compound documents via `include`, sparse fieldsets
//! - **Queries** – sorting, filtering and offset or page-number pagination
//!   with generated links
//! - **Errors** – every failure is a JSON:API error document, panics included
//! - **Observability** – structured logs and Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hypatia::prelude::*;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Planet {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Model for Planet {
//!     const TYPE: &'static str = "planets";
//!
//!     fn id(&self) -> String {
//!         self.id.clone()
//!     }
//!
//!     fn set_id(&mut self, id: String) {
//!         self.id = id;
//!     }
//!
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
//!         Ok(Collection::full(vec![Planet { id: "3".into(), name: "Earth".into() }]))
//!     }
//!
//!     fn capabilities(&self) -> Capabilities {
//!         Capabilities { find_all: true, ..Capabilities::NONE }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry(&TelemetryConfig::default())?;
//!
//!     let mut api = Api::new(ApiConfig::builder().prefix("v1").build())?;
//!     api.add_resource(Planets)?;
//!
//!     let config = ServerConfig::builder().http_addr("127.0.0.1:31415").build();
//!     Server::new(config, api.into_handler()).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request Flow
//!
//! ```text
//! Request → Router → Negotiation → Query → Body decode → Resource
//!                                                           ↓
//! Response ← Error documents ← Includes/links ← Encode ←────┘
//! ```

#![doc(html_root_url = "https://docs.rs/hypatia/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use hypatia_core as core;

// Re-export router types
pub use hypatia_router as router;

// Re-export server types
pub use hypatia_server as server;

// Re-export telemetry
pub use hypatia_telemetry as telemetry;

// Resources are implemented with this attribute
pub use async_trait::async_trait;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use hypatia::prelude::*;
///
/// let config = ApiConfig::builder().prefix("api").build();
/// assert_eq!(config.prefix(), "api");
/// ```
pub mod prelude {
    pub use async_trait::async_trait;

    pub use hypatia_core::{
        ApiError, ApiResult, Capabilities, Collection, Document, ErrorKind, Field, FieldSet,
        Linkage, Meta, Model, Pagination, RegistryError, RequestContext, RequestId, Resource,
        ResourceIdentifier, ResourceObject, SortField,
    };

    pub use hypatia_router::{LinearRouter, RadixRouter, Routeable};

    pub use hypatia_server::{
        Api, ApiConfig, ApiHandler, FallbackHandler, RequestHostResolver, Server, ServerConfig,
        ServerError, ShutdownSignal, StaticResolver, UrlResolver,
    };

    pub use hypatia_telemetry::{init_telemetry, LogConfig, MetricsConfig, TelemetryConfig};
}
