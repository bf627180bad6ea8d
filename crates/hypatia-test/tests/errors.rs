//! Error documents for malformed and unsupported requests.

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};
use parking_lot::Mutex;
use hypatia_core::{
    ApiError, Capabilities, Collection, Field, FieldSet, Model, RequestContext, Resource,
};
use hypatia_server::{Api, ApiConfig};
use hypatia_test::{fixtures, TestClient};
use serde_json::json;

fn client() -> TestClient {
    TestClient::from_api(fixtures::api("api"))
}

#[tokio::test]
async fn test_content_type_with_parameters() {
    let response = client()
        .post("/api/chocolates")
        .body(r#"{"data":{"type":"chocolates","attributes":{"name":"Lindt"}}}"#)
        .content_type("application/vnd.api+json; charset=utf-8")
        .send()
        .await;
    response
        .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE)
        .assert_errors(&["415"]);
}

#[tokio::test]
async fn test_accept_only_with_parameters() {
    let response = client()
        .get("/api/chocolates")
        .accept("application/vnd.api+json; ext=bulk")
        .send()
        .await;
    response
        .assert_status(StatusCode::NOT_ACCEPTABLE)
        .assert_errors(&["406"]);
}

#[tokio::test]
async fn test_plain_json_is_accepted() {
    client()
        .post("/api/chocolates")
        .body(r#"{"data":{"type":"chocolates","attributes":{"name":"Lindt"}}}"#)
        .content_type("application/json")
        .accept("application/json")
        .send()
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_id_mismatch_is_a_conflict() {
    let client = client();
    client
        .post("/api/chocolates")
        .json(&json!({"data": {"type": "chocolates", "attributes": {"name": "Lindt"}}}))
        .send()
        .await;

    client
        .patch("/api/chocolates/1")
        .json(&json!({"data": {"type": "chocolates", "id": "2", "attributes": {"name": "Milka"}}}))
        .send()
        .await
        .assert_status(StatusCode::CONFLICT)
        .assert_errors(&["409"]);
}

#[tokio::test]
async fn test_body_too_large() {
    let mut api = Api::new(
        ApiConfig::builder()
            .prefix("api")
            .max_body_size(64)
            .build(),
    )
    .unwrap();
    api.add_resource(fixtures::ChocolateResource::default()).unwrap();
    let client = TestClient::from_api(api);

    let name = "x".repeat(128);
    client
        .post("/api/chocolates")
        .json(&json!({"data": {"type": "chocolates", "attributes": {"name": name}}}))
        .send()
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE)
        .assert_errors(&["413"]);
}

#[tokio::test]
async fn test_wrong_type_in_body() {
    let response = client()
        .post("/api/chocolates")
        .json(&json!({"data": {"type": "users", "attributes": {"user-name": "Sansa"}}}))
        .send()
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let errors = response.errors().unwrap();
    assert_eq!(errors[0].code.as_deref(), Some("TYPE_MISMATCH"));
    assert_eq!(
        errors[0].source.as_ref().and_then(|s| s.pointer.as_deref()),
        Some("/data/type")
    );
}

#[tokio::test]
async fn test_malformed_bodies() {
    let client = client();
    for body in [
        "not json",
        "[]",
        r#"{"meta": {}}"#,
        r#"{"data": [{"type": "chocolates"}]}"#,
        r#"{"data": {"attributes": {"name": "Lindt"}}}"#,
    ] {
        let response = client.post("/api/chocolates").body(body).send().await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.errors().unwrap()[0].code.as_deref(),
            Some("INVALID_DOCUMENT"),
            "body: {body}"
        );
    }
}

#[tokio::test]
async fn test_all_body_problems_reported_together() {
    let response = client()
        .post("/api/chocolates")
        .body(r#"{"data": {"type": "chocolates", "id": 7, "attributes": [], "relationships": 1}}"#)
        .send()
        .await;
    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_errors(&["400", "400", "400"]);
}

#[tokio::test]
async fn test_null_attribute() {
    let client = client();
    client
        .post("/api/chocolates")
        .json(&json!({"data": {"type": "chocolates", "attributes": {"name": "Lindt"}}}))
        .send()
        .await;

    let response = client
        .patch("/api/chocolates/1")
        .json(&json!({"data": {"type": "chocolates", "attributes": {"name": null}}}))
        .send()
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.errors().unwrap()[0]
            .source
            .as_ref()
            .and_then(|s| s.pointer.as_deref()),
        Some("/data/attributes/name")
    );
}

#[tokio::test]
async fn test_unknown_sort_field() {
    let response = client().get("/api/users").query("sort", "age").send().await;
    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_errors(&["400"]);
    assert_eq!(
        response.errors().unwrap()[0]
            .source
            .as_ref()
            .and_then(|s| s.parameter.as_deref()),
        Some("sort")
    );
}

#[tokio::test]
async fn test_unrouted_method() {
    let response = client().request(Method::PUT, "/api/users/1").send().await;
    response
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_errors(&["405"]);
    let allow = response.header_str("Allow").unwrap();
    for method in ["GET", "PATCH", "DELETE", "OPTIONS"] {
        assert!(allow.contains(method), "Allow: {allow}");
    }
}

#[tokio::test]
async fn test_error_documents_carry_request_id() {
    let response = client().get("/api/users/9").send().await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.json_value().unwrap();
    assert!(body["meta"]["request_id"].is_string());
    assert!(body.get("data").is_none());
}

#[derive(Debug, Default, Clone)]
struct Notice {
    id: String,
    text: String,
}

impl Model for Notice {
    const TYPE: &'static str = "notices";

    fn id(&self) -> String {
        self.id.clone()
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn fields() -> FieldSet<Self> {
        FieldSet::<Self>::new().with(Field::<Self>::attribute("text", |n| &n.text, |n| &mut n.text))
    }
}

/// Read-only: lists notices and nothing else.
struct Notices;

#[async_trait]
impl Resource for Notices {
    type Model = Notice;

    async fn find_all(&self, _ctx: &RequestContext) -> Result<Collection<Notice>, ApiError> {
        Ok(Collection::full(vec![Notice {
            id: "1".into(),
            text: "Winter is coming".into(),
        }]))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            find_all: true,
            find_one: false,
            create: false,
            update: false,
            delete: false,
        }
    }
}

#[tokio::test]
async fn test_missing_capabilities() {
    let mut api = Api::new(ApiConfig::default()).unwrap();
    api.add_resource(Notices).unwrap();
    let client = TestClient::from_api(api);

    client
        .get("/notices")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("data.0.attributes.text", &json!("Winter is coming"));

    client
        .post("/notices")
        .json(&json!({"data": {"type": "notices", "attributes": {"text": "hi"}}}))
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_errors(&["405"]);

    client
        .get("/notices/1")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    client
        .delete("/notices/1")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);

    client
        .options("/notices")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT)
        .assert_header("Allow", "GET, OPTIONS");
    client
        .options("/notices/1")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT)
        .assert_header("Allow", "OPTIONS");
}

/// Lists panic; single notices load fine.
struct Volatile;

#[async_trait]
impl Resource for Volatile {
    type Model = Notice;

    async fn find_all(&self, _ctx: &RequestContext) -> Result<Collection<Notice>, ApiError> {
        panic!("notice board collapsed")
    }

    async fn find_one(&self, id: &str, _ctx: &RequestContext) -> Result<Notice, ApiError> {
        Ok(Notice {
            id: id.to_string(),
            text: "still here".into(),
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_ONLY
    }
}

#[tokio::test]
async fn test_panic_in_resource_is_a_500() {
    let mut api = Api::new(ApiConfig::builder().prefix("api").build()).unwrap();
    api.add_resource(Volatile).unwrap();
    let client = TestClient::from_api(api);

    let response = client.get("/api/notices").send().await;
    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_errors(&["500"]);
    let errors = response.errors().unwrap();
    assert_eq!(errors[0].code.as_deref(), Some("INTERNAL_ERROR"));
    assert!(!errors[0].title.contains("collapsed"));

    client
        .get("/api/notices/1")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("data.attributes.text", &json!("still here"));
}

/// Accepts updates but can neither list nor load notices.
#[derive(Default)]
struct Outbox {
    sent: Arc<Mutex<Vec<Notice>>>,
}

#[async_trait]
impl Resource for Outbox {
    type Model = Notice;

    async fn update(&self, notice: Notice, _ctx: &RequestContext) -> Result<(), ApiError> {
        self.sent.lock().push(notice);
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            update: true,
            ..Capabilities::NONE
        }
    }
}

#[tokio::test]
async fn test_update_without_find_one() {
    let outbox = Outbox::default();
    let sent = Arc::clone(&outbox.sent);
    let mut api = Api::new(ApiConfig::default()).unwrap();
    api.add_resource(outbox).unwrap();
    let client = TestClient::from_api(api);

    client
        .patch("/notices/7")
        .json(&json!({"data": {"type": "notices", "id": "7", "attributes": {"text": "hi"}}}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    {
        let sent = sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!((sent[0].id.as_str(), sent[0].text.as_str()), ("7", "hi"));
    }

    client
        .options("/notices/7")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT)
        .assert_header("Allow", "PATCH, OPTIONS");
    client
        .options("/notices")
        .send()
        .await
        .assert_header("Allow", "OPTIONS");
    client
        .get("/notices/7")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
