//! Test request building.

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::Full;
use hypatia_core::MEDIA_TYPE;
use serde::Serialize;

use crate::error::TestError;

/// A test request that can be sent to a [`TestClient`](crate::TestClient).
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl TestRequest {
    /// Creates a new GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Creates a new POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Creates a new PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Creates a new DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// Creates a new OPTIONS request.
    pub fn options(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::OPTIONS, uri)
    }

    /// Converts this request to an HTTP request.
    pub fn into_http_request(self) -> http::Request<Full<Bytes>> {
        let mut request = http::Request::new(Full::new(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

/// Builder for constructing test requests.
///
/// Invalid headers and URIs are reported by [`build`](Self::build), not
/// when they are set.
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Sets a header on the request.
    ///
    /// # Example
    ///
    /// ```
    /// use hypatia_test::TestRequest;
    ///
    /// let request = TestRequest::get("/api/users")
    ///     .header("Accept", "application/vnd.api+json")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.headers["accept"], "application/vnd.api+json");
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref());
        let value = HeaderValue::try_from(value.as_ref());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => self.fail(TestError::InvalidHeader(e.to_string())),
            (_, Err(e)) => self.fail(TestError::InvalidHeader(e.to_string())),
        }
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the Accept header.
    pub fn accept(self, accept: impl AsRef<str>) -> Self {
        self.header(header::ACCEPT.as_str(), accept)
    }

    /// Appends a query parameter; both parts are percent-encoded.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the request body as a JSON:API document.
    ///
    /// This also sets the `Content-Type` header to `application/vnd.api+json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(TestError::Json(e)),
        }
        self.content_type(MEDIA_TYPE)
    }

    fn fail(&mut self, error: TestError) {
        self.error.get_or_insert(error);
    }

    /// Builds the test request.
    pub fn build(self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut uri = self.uri;
        if !self.query.is_empty() {
            let query: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            let separator = if uri.contains('?') { '&' } else { '?' };
            uri = format!("{uri}{separator}{}", query.join("&"));
        }

        let uri: Uri = uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        })
    }
}
