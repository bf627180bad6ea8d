//! Responses for requests no route accepts.

use http::{Method, StatusCode};
use hypatia_core::{ApiError, RequestId};

use crate::response::{self, HttpResponse};

/// Answers requests the router could not match.
///
/// Install a custom implementation with
/// [`Api::with_fallback`](crate::Api::with_fallback), e.g. to hand unknown
/// paths to another application.
pub trait FallbackHandler: Send + Sync {
    /// No route matched the path.
    fn not_found(&self, method: &Method, path: &str, request_id: RequestId) -> HttpResponse;

    /// The path matched, but not for this method.
    fn method_not_allowed(
        &self,
        method: &Method,
        path: &str,
        allowed: &[Method],
        request_id: RequestId,
    ) -> HttpResponse;
}

/// Default fallback: JSON:API error documents, with an `Allow` header on 405.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApiFallback;

impl FallbackHandler for JsonApiFallback {
    fn not_found(&self, _method: &Method, path: &str, request_id: RequestId) -> HttpResponse {
        response::error(
            &ApiError::http(StatusCode::NOT_FOUND, format!("no route matches `{path}`")),
            request_id,
        )
    }

    fn method_not_allowed(
        &self,
        method: &Method,
        path: &str,
        allowed: &[Method],
        request_id: RequestId,
    ) -> HttpResponse {
        let error = ApiError::method_not_allowed(format!("{method} is not allowed on `{path}`"));
        response::with_allow(response::error(&error, request_id), allowed)
    }
}
