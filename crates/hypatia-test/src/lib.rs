//! # Hypatia Test
//!
//! Test utilities for the Hypatia framework, providing in-memory JSON:API
//! testing without network connections or port binding.
//!
//! ## Key Features
//!
//! - **In-Memory Testing**: requests go straight into an [`ApiHandler`](hypatia_server::ApiHandler)
//! - **Request Builder**: fluent API for building test requests, including query parameters
//! - **Response Assertions**: status, header, JSON path and error document helpers
//! - **Fixtures**: the users/chocolates example resources
//!
//! ## Example
//!
//! ```
//! # tokio_test::block_on(async {
//! use hypatia_test::{fixtures, TestClient};
//! use http::StatusCode;
//! use serde_json::json;
//!
//! let client = TestClient::from_api(fixtures::api("api"));
//!
//! let response = client
//!     .post("/api/users")
//!     .json(&json!({"data": {"type": "users", "attributes": {"user-name": "Sansa Stark"}}}))
//!     .send()
//!     .await;
//! response
//!     .assert_status(StatusCode::CREATED)
//!     .assert_header("Location", "/api/users/1")
//!     .assert_json_field("data.attributes.user-name", &json!("Sansa Stark"));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/hypatia-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod fixtures;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
