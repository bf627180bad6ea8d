//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use hypatia_core::{Document, ErrorObject};
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A test response with helper methods for assertions.
pub struct TestResponse {
    /// HTTP status code
    status: StatusCode,
    /// Response headers
    headers: HeaderMap,
    /// Response body bytes
    body: Bytes,
}

impl TestResponse {
    /// Creates a new test response from an HTTP response.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body: body_bytes,
        })
    }

    /// Creates a test response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true if the status is successful (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        serde_json::from_slice(&self.body).map_err(TestError::Json)
    }

    /// Deserializes the body as a JSON Value.
    pub fn json_value(&self) -> Result<serde_json::Value, TestError> {
        self.json()
    }

    /// Deserializes the body as a JSON:API document.
    pub fn document(&self) -> Result<Document, TestError> {
        self.json()
    }

    /// Returns the error objects of an error document.
    pub fn errors(&self) -> Result<Vec<ErrorObject>, TestError> {
        Ok(self.document()?.errors)
    }

    // Assertion methods

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}: {}",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{}' not found", name));
        assert_eq!(
            actual, expected,
            "Header '{}': expected '{}', got '{}'",
            name, expected, actual
        );
        self
    }

    /// Asserts an error document with one error object per expected status.
    ///
    /// # Panics
    ///
    /// Panics if the body is not an error document or the statuses differ.
    pub fn assert_errors(&self, expected: &[&str]) -> &Self {
        let errors = self
            .errors()
            .unwrap_or_else(|e| panic!("Body is not a JSON:API document: {e}"));
        let statuses: Vec<&str> = errors.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, expected, "Error statuses mismatch");
        self
    }

    /// Asserts that the JSON body equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the JSON doesn't match.
    pub fn assert_json_eq(&self, expected: &serde_json::Value) -> &Self {
        let actual = self
            .json_value()
            .unwrap_or_else(|e| panic!("Body should be valid JSON: {e}"));
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Asserts that a JSON field exists and equals the expected value.
    ///
    /// Paths are dot-separated; numeric segments index arrays, e.g.
    /// `data.0.attributes.name`.
    ///
    /// # Panics
    ///
    /// Panics if the field doesn't exist or doesn't match.
    pub fn assert_json_field(&self, path: impl AsRef<str>, expected: &serde_json::Value) -> &Self {
        let path = path.as_ref();
        let json = self
            .json_value()
            .unwrap_or_else(|e| panic!("Body should be valid JSON: {e}"));
        let actual = json_path(&json, path).unwrap_or_else(|| {
            panic!("JSON path '{}' not found in: {}", path, json);
        });
        assert_eq!(
            actual, expected,
            "JSON field '{}': expected {}, got {}",
            path, expected, actual
        );
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Simple JSON path accessor.
fn json_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        if let Ok(index) = segment.parse::<usize>() {
            current = current.get(index)?;
        } else {
            current = current.get(segment)?;
        }
    }
    Some(current)
}
