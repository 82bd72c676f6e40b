//! Integration tests for users, products, and JSON file persistence.

#![allow(clippy::unwrap_used)]

use reqwest::{Method, StatusCode};
use serde_json::json;
use trinity_integration_tests::TestApp;

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("http://{}/health", app.addr))
        .header("x-request-id", "integration-42")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "integration-42"
    );
}

#[tokio::test]
async fn test_rename_carries_products_and_cart() {
    let app = TestApp::spawn().await;
    app.register("alice", "buyer").await;
    app.register("sam", "seller").await;
    app.list_product("Pedigree", 4.99, "sam").await;

    app.send(
        Method::POST,
        "/carts/alice/add",
        Some("alice"),
        Some(json!({ "productName": "Pedigree", "quantity": 2 })),
    )
    .await;

    let (status, _) = app
        .send(
            Method::PATCH,
            "/users/sam",
            None,
            Some(json!({ "newUsername": "samantha" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send(Method::GET, "/products/Pedigree", None, None).await;
    assert_eq!(body["product"]["ownerUsername"], "samantha");

    let (status, _) = app
        .send(
            Method::PATCH,
            "/users/alice",
            None,
            Some(json!({ "newUsername": "alicia" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(Method::GET, "/carts/alicia", Some("alicia"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn test_json_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let app = TestApp::spawn_in(dir.path()).await;
        app.register("alice", "buyer").await;
        app.register("sam", "seller").await;
        app.list_product("Pedigree", 4.99, "sam").await;
        let (status, _) = app
            .send(
                Method::POST,
                "/carts/alice/add",
                Some("alice"),
                Some(json!({ "productName": "Pedigree", "quantity": 3 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let app = TestApp::spawn_in(dir.path()).await;

    let (_, body) = app.send(Method::GET, "/users", None, None).await;
    assert_eq!(body["users"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .send(Method::GET, "/carts/alice", Some("alice"), None)
        .await;
    assert_eq!(
        body["cart"]["items"],
        json!([{ "productName": "Pedigree", "quantity": 3 }])
    );
}
