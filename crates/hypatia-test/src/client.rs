//! Test client for in-memory JSON:API testing.

use bytes::Bytes;
use http::Method;
use hypatia_server::{Api, ApiHandler};
use serde::Serialize;

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// A test client for making in-memory HTTP requests.
///
/// Requests go through the full [`ApiHandler`] pipeline (routing, content
/// negotiation, query parsing, dispatch and encoding) without a socket.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use hypatia_test::{fixtures, TestClient};
///
/// let client = TestClient::new(fixtures::api("api").into_handler());
///
/// let response = client.get("/api/users").send().await;
/// assert_eq!(response.status_code(), 200);
/// response.assert_json_field("data", &serde_json::json!([]));
/// # });
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    /// The handler that processes requests.
    handler: ApiHandler,
    /// Default headers to add to all requests.
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a new test client around a frozen API.
    pub fn new(handler: ApiHandler) -> Self {
        Self {
            handler,
            default_headers: Vec::new(),
        }
    }

    /// Freezes `api` and creates a client for it.
    pub fn from_api(api: Api) -> Self {
        Self::new(api.into_handler())
    }

    /// Adds a default header that will be included in all requests.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Creates a GET request builder.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(uri))
    }

    /// Creates a POST request builder.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(uri))
    }

    /// Creates a PATCH request builder.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::patch(uri))
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::delete(uri))
    }

    /// Creates an OPTIONS request builder.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::options(uri))
    }

    /// Creates a request builder with a custom method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    /// Sends a test request and returns the response.
    async fn send_internal(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let response = self.handler.handle(request.into_http_request()).await;
        TestResponse::from_http(response).await
    }
}

/// A request builder bound to a test client.
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, builder: TestRequestBuilder) -> Self {
        let mut builder = builder;
        for (name, value) in &client.default_headers {
            builder = builder.header(name, value);
        }
        Self { client, builder }
    }

    /// Sets a header on the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the Accept header.
    pub fn accept(mut self, accept: impl AsRef<str>) -> Self {
        self.builder = self.builder.accept(accept);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.query(key, value);
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets the request body as a JSON:API document.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request and returns the response.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request and returns a Result.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.send_internal(request).await
    }
}
