//! Sparse fieldsets.

use http::StatusCode;
use hypatia_test::{fixtures, TestClient};
use serde_json::json;

async fn seeded() -> TestClient {
    let client = TestClient::from_api(fixtures::api("api"));
    client
        .post("/api/users")
        .json(&json!({"data": {"type": "users", "attributes": {"user-name": "Sansa"}}}))
        .send()
        .await;
    client
        .post("/api/chocolates")
        .json(&json!({"data": {"type": "chocolates", "attributes": {"name": "Lindt", "taste": "Bitter"}}}))
        .send()
        .await;
    client
        .post("/api/users/1/relationships/sweets")
        .json(&json!({"data": [{"type": "chocolates", "id": "1"}]}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    client
}

#[tokio::test]
async fn test_fieldset_limits_attributes() {
    let client = seeded().await;
    let response = client
        .get("/api/chocolates/1")
        .query("fields[chocolates]", "taste")
        .send()
        .await;
    response
        .assert_status(StatusCode::OK)
        .assert_json_field("data.attributes", &json!({"taste": "Bitter"}));
}

#[tokio::test]
async fn test_fieldset_applies_to_included() {
    let client = seeded().await;
    let response = client
        .get("/api/users/1")
        .query("include", "sweets")
        .query("fields[chocolates]", "name")
        .send()
        .await;
    response
        .assert_status(StatusCode::OK)
        .assert_json_field("data.attributes.user-name", &json!("Sansa"))
        .assert_json_field("included.0.attributes", &json!({"name": "Lindt"}));
}

#[tokio::test]
async fn test_fieldset_keeps_linkage() {
    let client = seeded().await;
    let response = client
        .get("/api/users")
        .query("fields[users]", "sweets")
        .send()
        .await;
    response.assert_status(StatusCode::OK).assert_json_field(
        "data.0.relationships.sweets.data",
        &json!([{"type": "chocolates", "id": "1"}]),
    );
    assert!(response.json_value().unwrap()["data"][0]
        .get("attributes")
        .is_none());
}

#[tokio::test]
async fn test_unknown_fields_are_rejected() {
    let client = seeded().await;
    let response = client
        .get("/api/chocolates")
        .query("fields[chocolates]", "name,calories")
        .query("fields[cakes]", "flavour")
        .send()
        .await;

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_errors(&["400", "400"]);
    let parameters: Vec<_> = response
        .errors()
        .unwrap()
        .into_iter()
        .filter_map(|e| e.source.and_then(|s| s.parameter))
        .collect();
    assert!(parameters.contains(&"fields[chocolates]".to_string()));
    assert!(parameters.contains(&"fields[cakes]".to_string()));
}
