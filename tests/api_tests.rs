use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use winter_clothes_api::{
    AppConfig, AppState, create_router,
    auth::decode_token,
    config::LOCAL_JWT_SECRET,
    repository::{MemoryRepository, RepositoryState},
};

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

/// Serves the full router on an ephemeral port, backed by the in-memory store.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let state = AppState::new(repo, AppConfig::default());
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/winter-clothes", app.address))
        .header("origin", "http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_registration_and_login_flow() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/v1/register", app.address))
        .json(&json!({ "name": "A", "email": "a@x.com", "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("{}/api/v1/login", app.address))
        .json(&json!({ "email": "a@x.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(format!("{}/api/v1/login", app.address))
        .json(&json!({ "email": "a@x.com", "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let token = body["data"]["token"].as_str().unwrap();

    let claims = decode_token(token, LOCAL_JWT_SECRET).expect("token must verify with the server secret");
    assert_eq!(claims.email, "a@x.com");
    assert!(claims.exp > chrono::Utc::now().timestamp());

    let users: Value = client
        .get(format!("{}/api/v1/users", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let matching: Vec<&Value> = users["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|user| user["email"] == "a@x.com")
        .collect();
    assert_eq!(matching.len(), 1);
}

#[tokio::test]
async fn test_clothing_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Create
    let created: Value = client
        .post(format!("{}/api/v1/create-winter-clothes", app.address))
        .json(&json!({ "title": "Puffer", "category": "Jacket", "size": "L" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let item_url = format!("{}/api/v1/winter-clothes/{}", app.address, id);

    // Replace
    let resp = client
        .put(&item_url)
        .json(&json!({ "title": "Parka", "category": "Jacket" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let fetched: Value = client.get(&item_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(fetched["data"]["title"], "Parka");
    assert!(fetched["data"].get("size").is_none());

    // Delete
    let deleted: Value = client.delete(&item_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(deleted["data"]["deletedCount"], 1);

    let resp = client.get(&item_url).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}
