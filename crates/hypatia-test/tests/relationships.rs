//! Relationship endpoints: linkage reads and mutations, related resources.

use http::StatusCode;
use hypatia_test::{fixtures, TestClient};
use serde_json::{json, Value};

/// Two users and three chocolates, nothing linked yet.
async fn seeded() -> TestClient {
    let client = TestClient::from_api(fixtures::api("api"));
    for name in ["Sansa", "Arya"] {
        client
            .post("/api/users")
            .json(&json!({"data": {"type": "users", "attributes": {"user-name": name}}}))
            .send()
            .await
            .assert_status(StatusCode::CREATED);
    }
    for name in ["Ritter Sport", "Lindt", "Milka"] {
        client
            .post("/api/chocolates")
            .json(&json!({"data": {"type": "chocolates", "attributes": {"name": name, "taste": "Sweet"}}}))
            .send()
            .await
            .assert_status(StatusCode::CREATED);
    }
    client
}

fn chocolates(ids: &[&str]) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({"type": "chocolates", "id": id}))
        .collect();
    json!({ "data": data })
}

async fn sweet_ids(client: &TestClient) -> Vec<String> {
    let response = client.get("/api/users/1/relationships/sweets").send().await;
    response.assert_status(StatusCode::OK);
    response.json_value().unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ident| ident["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_add_remove_replace_to_many() {
    let client = seeded().await;

    client
        .post("/api/users/1/relationships/sweets")
        .json(&chocolates(&["1", "2"]))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(sweet_ids(&client).await, vec!["1", "2"]);

    // Adding an existing member is a no-op for that member.
    client
        .post("/api/users/1/relationships/sweets")
        .json(&chocolates(&["2", "3"]))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(sweet_ids(&client).await, vec!["1", "2", "3"]);

    client
        .delete("/api/users/1/relationships/sweets")
        .json(&chocolates(&["1"]))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(sweet_ids(&client).await, vec!["2", "3"]);

    client
        .patch("/api/users/1/relationships/sweets")
        .json(&chocolates(&["1"]))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(sweet_ids(&client).await, vec!["1"]);

    client
        .patch("/api/users/1/relationships/sweets")
        .json(&json!({"data": []}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert!(sweet_ids(&client).await.is_empty());
}

#[tokio::test]
async fn test_relationship_document_links() {
    let client = seeded().await;
    client
        .get("/api/users/1/relationships/sweets")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("data", &json!([]))
        .assert_json_field("links.self", &json!("/api/users/1/relationships/sweets"))
        .assert_json_field("links.related", &json!("/api/users/1/sweets"));
}

#[tokio::test]
async fn test_missing_targets_are_all_reported() {
    let client = seeded().await;
    client
        .post("/api/users/1/relationships/sweets")
        .json(&chocolates(&["1"]))
        .send()
        .await;

    let response = client
        .post("/api/users/1/relationships/sweets")
        .json(&chocolates(&["2", "8", "9"]))
        .send()
        .await;
    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_errors(&["404", "404"]);

    // Nothing was written.
    assert_eq!(sweet_ids(&client).await, vec!["1"]);
}

#[tokio::test]
async fn test_wrong_identifier_type() {
    let client = seeded().await;
    let response = client
        .post("/api/users/1/relationships/sweets")
        .json(&json!({"data": [{"type": "users", "id": "2"}, {"type": "cakes", "id": "1"}]}))
        .send()
        .await;

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_errors(&["400", "400"]);
    for error in response.errors().unwrap() {
        assert_eq!(error.code.as_deref(), Some("TYPE_MISMATCH"));
    }
}

#[tokio::test]
async fn test_to_one_replace_and_clear() {
    let client = seeded().await;

    client
        .patch("/api/users/1/relationships/best-friend")
        .json(&json!({"data": {"type": "users", "id": "2"}}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    client
        .get("/api/users/1/relationships/best-friend")
        .send()
        .await
        .assert_json_field("data", &json!({"type": "users", "id": "2"}));

    client
        .get("/api/users/1/best-friend")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("data.id", &json!("2"))
        .assert_json_field("data.attributes.user-name", &json!("Arya"));

    client
        .patch("/api/users/1/relationships/best-friend")
        .json(&json!({"data": null}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    client
        .get("/api/users/1/best-friend")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("data", &json!(null));
}

#[tokio::test]
async fn test_to_one_rejects_add_and_remove() {
    let client = seeded().await;
    for method in ["POST", "DELETE"] {
        let response = client
            .request(method.parse().unwrap(), "/api/users/1/relationships/best-friend")
            .json(&json!({"data": [{"type": "users", "id": "2"}]}))
            .send()
            .await;
        response
            .assert_status(StatusCode::METHOD_NOT_ALLOWED)
            .assert_errors(&["405"]);
    }
}

#[tokio::test]
async fn test_to_one_rejects_array() {
    let client = seeded().await;
    client
        .patch("/api/users/1/relationships/best-friend")
        .json(&json!({"data": [{"type": "users", "id": "2"}]}))
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_related_collection() {
    let client = seeded().await;
    client
        .post("/api/users/1/relationships/sweets")
        .json(&chocolates(&["3", "1"]))
        .send()
        .await;

    let response = client.get("/api/users/1/sweets").send().await;
    response.assert_status(StatusCode::OK);
    let body = response.json_value().unwrap();
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["attributes"]["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Milka", "Ritter Sport"]);
    assert_eq!(body["data"][0]["type"], "chocolates");
}

#[tokio::test]
async fn test_related_skips_deleted_targets() {
    let client = seeded().await;
    client
        .post("/api/users/1/relationships/sweets")
        .json(&chocolates(&["1", "2"]))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    client
        .patch("/api/users/1/relationships/best-friend")
        .json(&json!({"data": {"type": "users", "id": "2"}}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    client
        .delete("/api/chocolates/1")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    client
        .delete("/api/users/2")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = client.get("/api/users/1/sweets").send().await;
    response.assert_status(StatusCode::OK);
    let ids: Vec<_> = response.json_value().unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["2"]);

    client
        .get("/api/users/1/best-friend")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("data", &Value::Null);

    // Linkage itself is left untouched.
    assert_eq!(sweet_ids(&client).await, vec!["1", "2"]);
}

#[tokio::test]
async fn test_relationship_of_missing_owner() {
    let client = seeded().await;
    client
        .get("/api/users/42/relationships/sweets")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
    client
        .post("/api/users/42/relationships/sweets")
        .json(&chocolates(&["1"]))
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_relationships_in_resource_body() {
    let client = seeded().await;
    client
        .patch("/api/users/2")
        .json(&json!({"data": {
            "type": "users",
            "id": "2",
            "relationships": {
                "sweets": {"data": [{"type": "chocolates", "id": "2"}]},
                "best-friend": {"data": {"type": "users", "id": "1"}}
            }
        }}))
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    client
        .get("/api/users/2")
        .send()
        .await
        .assert_json_field("data.attributes.user-name", &json!("Arya"))
        .assert_json_field(
            "data.relationships.sweets.data",
            &json!([{"type": "chocolates", "id": "2"}]),
        )
        .assert_json_field(
            "data.relationships.best-friend.data",
            &json!({"type": "users", "id": "1"}),
        );
}
