//! Integration tests for Trinity.
//!
//! Each test spawns the real router on an ephemeral port and talks to it
//! over HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p trinity-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_api` - Cart ownership and line management
//! - `catalog_api` - Users, products, and JSON persistence

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use trinity_api::db::{MemoryStore, Stores};
use trinity_api::middleware::ACTING_USER_HEADER;
use trinity_api::state::AppState;

/// A running API server and a client pointed at it.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    server: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Spawn a server over a fresh in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with(MemoryStore::new()).await
    }

    /// Spawn a server persisting JSON files under `data_dir`.
    pub async fn spawn_in(data_dir: &Path) -> Self {
        let store = MemoryStore::open(data_dir)
            .await
            .expect("Failed to open data directory");
        Self::spawn_with(store).await
    }

    async fn spawn_with(store: MemoryStore) -> Self {
        let state = AppState::new(Stores::memory(Arc::new(store)));
        let app = trinity_api::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to read local address");

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            addr,
            client: Client::new(),
            server,
        }
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        acting: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self
            .client
            .request(method, format!("http://{}{path}", self.addr));
        if let Some(acting) = acting {
            request = request.header(ACTING_USER_HEADER, acting);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.expect("Request failed");
        let status = response.status();
        let text = response.text().await.expect("Failed to read body");
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, value)
    }

    /// Register a user, panicking unless the API accepts it.
    pub async fn register(&self, username: &str, role: &str) {
        let (status, body) = self
            .send(
                Method::POST,
                "/users",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "name": username,
                    "email": format!("{username}@example.com"),
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {username}: {body}");
    }

    /// List a product owned by `owner`, panicking unless the API accepts it.
    pub async fn list_product(&self, name: &str, price: f64, owner: &str) {
        let (status, body) = self
            .send(
                Method::POST,
                "/products",
                None,
                Some(serde_json::json!({
                    "productName": name,
                    "category": "General",
                    "price": price,
                    "ownerUsername": owner,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "list {name}: {body}");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

