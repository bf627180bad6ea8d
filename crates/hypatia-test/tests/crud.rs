//! Create, read, update and delete through the full handler.

use http::StatusCode;
use hypatia_test::{fixtures, TestClient};
use serde_json::json;

fn client() -> TestClient {
    TestClient::from_api(fixtures::api("api"))
}

#[tokio::test]
async fn test_user_lifecycle() {
    let client = client();

    let created = client
        .post("/api/users")
        .json(&json!({"data": {"type": "users", "attributes": {"user-name": "Sansa Stark"}}}))
        .send()
        .await;
    created
        .assert_status(StatusCode::CREATED)
        .assert_header("Location", "/api/users/1")
        .assert_header("Content-Type", "application/vnd.api+json")
        .assert_json_field("data.id", &json!("1"))
        .assert_json_field("data.type", &json!("users"))
        .assert_json_field("data.relationships.sweets.data", &json!([]))
        .assert_json_field("data.relationships.best-friend.data", &json!(null))
        .assert_json_field(
            "data.relationships.sweets.links.self",
            &json!("/api/users/1/relationships/sweets"),
        )
        .assert_json_field("meta.license", &json!("wtfpl"));

    client
        .get("/api/users/1")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("data.attributes.user-name", &json!("Sansa Stark"));

    client
        .patch("/api/users/1")
        .json(&json!({"data": {"type": "users", "id": "1", "attributes": {"user-name": "Alayne"}}}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let list = client.get("/api/users").send().await;
    list.assert_status(StatusCode::OK)
        .assert_json_field("data.0.attributes.user-name", &json!("Alayne"));
    assert_eq!(list.json_value().unwrap()["data"].as_array().unwrap().len(), 1);
    assert!(list.json_value().unwrap().get("links").is_none());

    client
        .delete("/api/users/1")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    client
        .get("/api/users/1")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_errors(&["404"]);

    client
        .delete("/api/users/1")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_only_touches_present_members() {
    let client = client();
    client
        .post("/api/chocolates")
        .json(&json!({"data": {"type": "chocolates", "attributes": {"name": "Ritter Sport", "taste": "Very Good"}}}))
        .send()
        .await
        .assert_status(StatusCode::CREATED);

    client
        .patch("/api/chocolates/1")
        .json(&json!({"data": {"type": "chocolates", "id": "1", "attributes": {"taste": "Bitter"}}}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    client
        .get("/api/chocolates/1")
        .send()
        .await
        .assert_json_field("data.attributes.name", &json!("Ritter Sport"))
        .assert_json_field("data.attributes.taste", &json!("Bitter"));
}

#[tokio::test]
async fn test_patch_without_body_id_uses_path_id() {
    let client = client();
    client
        .post("/api/chocolates")
        .json(&json!({"data": {"type": "chocolates", "attributes": {"name": "Milka"}}}))
        .send()
        .await;

    client
        .patch("/api/chocolates/1")
        .json(&json!({"data": {"type": "chocolates", "attributes": {"name": "Lindt"}}}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    client
        .get("/api/chocolates/1")
        .send()
        .await
        .assert_json_field("data.attributes.name", &json!("Lindt"));
}

#[tokio::test]
async fn test_create_validation_from_resource() {
    let client = client();
    let response = client
        .post("/api/users")
        .json(&json!({"data": {"type": "users", "attributes": {"user-name": "  "}}}))
        .send()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let errors = response.errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].source.as_ref().and_then(|s| s.pointer.as_deref()),
        Some("/data/attributes/user-name")
    );
}

#[tokio::test]
async fn test_create_missing_required_attribute() {
    let client = client();
    let response = client
        .post("/api/chocolates")
        .json(&json!({"data": {"type": "chocolates", "attributes": {"taste": "Sweet"}}}))
        .send()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let errors = response.errors().unwrap();
    assert_eq!(
        errors[0].source.as_ref().and_then(|s| s.pointer.as_deref()),
        Some("/data/attributes/name")
    );
}

#[tokio::test]
async fn test_filter_by_taste() {
    let client = client();
    for (name, taste) in [("Ritter Sport", "Very Good"), ("Lindt", "Bitter"), ("Milka", "Very Good")] {
        client
            .post("/api/chocolates")
            .json(&json!({"data": {"type": "chocolates", "attributes": {"name": name, "taste": taste}}}))
            .send()
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = client
        .get("/api/chocolates")
        .query("filter[taste]", "Very Good")
        .send()
        .await;
    response.assert_status(StatusCode::OK);
    let body = response.json_value().unwrap();
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["attributes"]["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Ritter Sport", "Milka"]);
}

#[tokio::test]
async fn test_sort_users() {
    let client = client();
    for name in ["Brienne", "Arya", "Catelyn"] {
        client
            .post("/api/users")
            .json(&json!({"data": {"type": "users", "attributes": {"user-name": name}}}))
            .send()
            .await;
    }

    let response = client.get("/api/users").query("sort", "-user-name").send().await;
    response.assert_status(StatusCode::OK);
    let body = response.json_value().unwrap();
    let ids: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["3", "1", "2"]);
}

#[tokio::test]
async fn test_ids_in_path_are_percent_decoded() {
    let client = client();
    client
        .get("/api/users/no%20such")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
