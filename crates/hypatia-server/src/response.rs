//! Response construction.

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use hypatia_core::{ApiError, Document, RequestId, MEDIA_TYPE};

/// Response body type.
pub type ResponseBody = Full<Bytes>;

/// HTTP response type produced by the dispatcher.
pub type HttpResponse = Response<ResponseBody>;

/// Last-resort body if a document cannot be serialised.
const INTERNAL_ERROR_BODY: &str =
    r#"{"errors":[{"status":"500","code":"INTERNAL_ERROR","title":"Internal Server Error"}]}"#;

/// Serialises `document` with the JSON:API content type.
pub(crate) fn document(status: StatusCode, document: &Document) -> HttpResponse {
    match serde_json::to_vec(document) {
        Ok(body) => with_body(status, Bytes::from(body)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response document");
            with_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(INTERNAL_ERROR_BODY.as_bytes()),
            )
        }
    }
}

fn with_body(status: StatusCode, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
    response
}

/// `201 Created` with a `Location` header.
pub(crate) fn created(doc: &Document, location: &str) -> HttpResponse {
    let mut response = document(StatusCode::CREATED, doc);
    if response.status() == StatusCode::CREATED {
        if let Ok(value) = HeaderValue::from_str(location) {
            response.headers_mut().insert(LOCATION, value);
        }
    }
    response
}

/// A body-less response, `204 No Content` in practice.
pub(crate) fn empty(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Renders `error` as an error document.
pub(crate) fn error(error: &ApiError, request_id: RequestId) -> HttpResponse {
    document(error.status(), &error.to_document(Some(&request_id)))
}

/// Adds an `Allow` header listing `methods`.
pub(crate) fn with_allow(mut response: HttpResponse, methods: &[Method]) -> HttpResponse {
    let joined = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&joined) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}
