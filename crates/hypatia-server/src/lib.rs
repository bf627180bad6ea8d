//! # Hypatia Server
//!
//! Turns registered resources into a JSON:API over HTTP.
//!
//! This crate provides:
//!
//! - [`Api`]: resource registration and route derivation
//! - [`ApiHandler`]: the request handler, usable from any Hyper stack
//! - [`Server`]: a standalone HTTP/1.1 server with graceful shutdown
//! - [`UrlResolver`] and [`FallbackHandler`] extension points
//!
//! ## Example
//!
//! ```rust,ignore
//! use hypatia_server::{Api, ApiConfig, Server, ServerConfig};
//!
//! let mut api = Api::new(ApiConfig::builder().prefix("api").build())?;
//! api.add_resource(UserResource::default())?;
//! api.add_resource(ChocolateResource::default())?;
//!
//! Server::new(ServerConfig::default(), api.into_handler()).run().await?;
//! ```

#![doc(html_root_url = "https://docs.rs/hypatia-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod api;
mod config;
mod dispatch;
mod error;
mod fallback;
mod negotiate;
mod present;
mod response;
mod routes;
mod server;
mod shutdown;
mod url;

pub use api::{Api, ApiHandler};
pub use config::{
    ApiConfig, ApiConfigBuilder, ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR,
    DEFAULT_MAX_BODY_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use error::ServerError;
pub use fallback::{FallbackHandler, JsonApiFallback};
pub use response::{HttpResponse, ResponseBody};
pub use routes::{Action, Endpoint, RouteInfo};
pub use server::Server;
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use url::{RequestHostResolver, StaticResolver, UrlResolver};
