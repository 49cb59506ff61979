mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use docbridge::{bson::doc, query::CollectionPath};

use docbridge::store::DocumentStore;
use docbridge_gateway::config::GatewayConfig;

use common::{NestedReadFailingStore, app, app_with};

#[tokio::test]
async fn healthz_is_ok() {
    let app = app();
    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/healthz")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!("ok"));
}

#[tokio::test]
async fn object_lifecycle() {
    let app = app();

    let created = app
        .json(
            Method::POST,
            "/api/create-object",
            json!({ "collectionName": "products", "objectData": { "name": "lamp", "price": 30, "stock": 2 } }),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["status"], json!("success"));

    let id = created.body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created.message(), format!("Object was created with ID: {id}"));

    let fetched = app
        .json(Method::GET, "/api/get-object", json!({ "collectionName": "products", "docId": id }))
        .await;
    assert_eq!(
        fetched.body["data"],
        json!({ "id": id, "name": "lamp", "price": 30, "stock": 2 })
    );

    let updated = app
        .json(
            Method::PUT,
            "/api/update-object",
            json!({ "collectionName": "products", "objectData": { "id": id, "name": "lamp" } }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.message(), format!("Object with ID: {id} was updated"));
    assert_eq!(updated.body["data"], json!({ "id": id, "name": "lamp" }));

    let fetched = app
        .json(Method::GET, "/api/get-object", json!({ "collectionName": "products", "docId": id }))
        .await;
    assert_eq!(fetched.body["data"], json!({ "id": id, "name": "lamp" }));

    let deleted = app
        .json(
            Method::DELETE,
            "/api/delete-object",
            json!({ "collectionName": "products", "objectData": { "id": id } }),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.message(), format!("Object with ID: {id} was deleted"));

    let fetched = app
        .json(Method::GET, "/api/get-object", json!({ "collectionName": "products", "docId": id }))
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["data"], json!(null));
}

#[tokio::test]
async fn collection_reads_filter_sort_and_nest() {
    let app = app();
    let teams = CollectionPath::parse("teams").unwrap();
    let collection = app.store.collection(teams.clone());

    collection.set("a", doc! { "name": "A", "rank": 3, "league": "east" }).await.unwrap();
    collection.set("b", doc! { "name": "B", "rank": 1, "league": "east" }).await.unwrap();
    collection.set("c", doc! { "name": "C", "rank": 2, "league": "west" }).await.unwrap();
    for (team, member) in [("a", "ann"), ("b", "bob"), ("b", "bea")] {
        app.store
            .collection(teams.sub_collection(team, "members").unwrap())
            .set(member, doc! { "team": team })
            .await
            .unwrap();
    }

    let response = app
        .json(
            Method::GET,
            "/api/get-collection",
            json!({
                "collectionName": "teams",
                "queries": [{ "key": "league", "compression": "==", "value": "east" }],
                "orderByKeys": [{ "key": "rank", "asc": true }],
                "subCollections": ["members"],
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(
        response.body["data"],
        json!([
            {
                "id": "b", "name": "B", "rank": 1, "league": "east",
                "members": [{ "id": "bea", "team": "b" }, { "id": "bob", "team": "b" }],
            },
            {
                "id": "a", "name": "A", "rank": 3, "league": "east",
                "members": [{ "id": "ann", "team": "a" }],
            },
        ])
    );

    let descending = app
        .json(
            Method::GET,
            "/api/get-collection",
            json!({ "collectionName": "teams", "orderByKeys": [{ "key": "rank" }] }),
        )
        .await;
    let ids = descending.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|team| team["id"].clone())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![json!("a"), json!("c"), json!("b")]);
}

#[tokio::test]
async fn failed_sub_collection_reads_fail_the_whole_read() {
    let app = app_with(
        GatewayConfig::default(),
        DocumentStore::new(NestedReadFailingStore::default()),
    );
    let teams = CollectionPath::parse("teams").unwrap();
    app.store.collection(teams.clone()).set("a", doc! { "name": "A" }).await.unwrap();
    app.store.collection(teams.clone()).set("b", doc! { "name": "B" }).await.unwrap();

    let plain = app
        .json(Method::GET, "/api/get-collection", json!({ "collectionName": "teams" }))
        .await;
    assert_eq!(plain.status, StatusCode::OK);
    assert_eq!(plain.body["data"].as_array().unwrap().len(), 2);

    let nested = app
        .json(
            Method::GET,
            "/api/get-collection",
            json!({ "collectionName": "teams", "subCollections": ["members"] }),
        )
        .await;
    assert_eq!(nested.status, StatusCode::BAD_REQUEST);
    assert_eq!(nested.body, json!({ "status": "error", "message": "unavailable" }));
    assert!(nested.body.get("data").is_none());
}

#[tokio::test]
async fn malformed_requests_are_rejected_before_the_store() {
    let app = app();

    let cases = [
        (
            Method::POST,
            "/api/create-object",
            json!({ "collectionName": "products" }),
            Some("\"objectData\" is required"),
        ),
        (
            Method::PUT,
            "/api/update-object",
            json!({ "collectionName": "products", "objectData": { "name": "x" } }),
            Some("\"objectData.id\" is required"),
        ),
        (
            Method::DELETE,
            "/api/delete-object",
            json!({ "collectionName": "products", "objectData": {} }),
            Some("\"objectData.id\" is required"),
        ),
        (
            Method::POST,
            "/api/create-object",
            json!({ "objectData": { "a": 1 } }),
            Some("\"collectionName\" is required"),
        ),
        (
            Method::GET,
            "/api/get-collection",
            json!({ "collectionName": "teams", "queries": [{ "key": "rank", "operator": "~", "value": 1 }] }),
            None,
        ),
        (
            Method::GET,
            "/api/get-collection",
            json!({ "collectionName": "teams/a" }),
            None,
        ),
        (
            Method::GET,
            "/api/get-collection",
            json!({ "collectionName": "teams", "limit": 5 }),
            None,
        ),
        (
            Method::GET,
            "/api/get-object",
            json!({ "collectionName": "teams" }),
            Some("\"docId\" is required"),
        ),
    ];

    for (method, uri, body, message) in cases {
        let response = app.json(method, uri, body.clone()).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri} {body}");
        assert_eq!(response.body["status"], json!("error"));
        if let Some(message) = message {
            assert_eq!(response.message(), message);
        }
    }

    assert_eq!(app.store.collection(CollectionPath::parse("products").unwrap()).scan().await.unwrap(), vec![]);
}
