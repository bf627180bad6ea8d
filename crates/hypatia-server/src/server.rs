//! Standalone HTTP server.
//!
//! Serves an [`ApiHandler`] over HTTP/1.1 using Hyper and Tokio. Embedding
//! applications that already run an HTTP stack can skip this module and
//! call [`ApiHandler::handle`] directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use hypatia_server::{Api, ApiConfig, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut api = Api::new(ApiConfig::builder().prefix("api").build())?;
//!     api.add_resource(Users::default())?;
//!
//!     let config = ServerConfig::builder().http_addr("0.0.0.0:31415").build();
//!     Server::new(config, api.into_handler()).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http::{Request, StatusCode};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hypatia_core::{ApiError, RequestId};
use tokio::net::{TcpListener, TcpStream};

use crate::api::ApiHandler;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::response::{self, HttpResponse};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Hypatia HTTP server.
pub struct Server {
    config: ServerConfig,
    handler: ApiHandler,
}

impl Server {
    /// Creates a server for `handler`.
    #[must_use]
    pub fn new(config: ServerConfig, handler: ApiHandler) -> Self {
        Self { config, handler }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs until `shutdown` is triggered.
    ///
    /// On shutdown the listener closes, open connections finish their
    /// in-flight request and close, and the call returns once they have
    /// drained or the shutdown timeout expires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::Bind(format!(
                "invalid address '{}': {}",
                self.config.http_addr(),
                e
            ))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("failed to bind to {addr}: {e}")))?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Server listening");

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    tracing::debug!(remote_addr = %remote_addr, error = %e, "Connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }
        drop(listener);

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            timeout = ?shutdown_timeout,
            active = tracker.active_connections(),
            "Waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_drain() => {
                tracing::info!("All connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "Shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |request: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(request).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote_addr = %remote_addr, "Closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(&self, request: Request<Incoming>) -> HttpResponse {
        let path = request.uri().path().to_string();
        match tokio::time::timeout(self.config.request_timeout(), self.handler.handle(request)).await
        {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(path = %path, "Request timed out");
                let error = ApiError::http(StatusCode::GATEWAY_TIMEOUT, "request timed out");
                response::error(&error, RequestId::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Api, ApiConfig};
    use std::time::Duration;

    fn handler() -> ApiHandler {
        Api::new(ApiConfig::default()).unwrap().into_handler()
    }

    #[test]
    fn test_server_new() {
        let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
        let server = Server::new(config, handler());
        assert_eq!(server.config().http_addr(), "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_run_invalid_address() {
        let config = ServerConfig::builder().http_addr("not-a-valid-address").build();
        let result = Server::new(config, handler())
            .run_with_shutdown(ShutdownSignal::new())
            .await;

        match result {
            Err(ServerError::Bind(msg)) => assert!(msg.contains("invalid address")),
            other => panic!("expected bind error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_and_shutdown() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:0")
            .shutdown_timeout(Duration::from_millis(100))
            .build();

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            Server::new(config, handler()).run_with_shutdown(shutdown),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }
}
