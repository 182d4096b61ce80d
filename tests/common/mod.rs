#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use erudite::app::{app, AppState};
use erudite::auth::{AuthGate, StaticKeyDirectory};
use erudite::store::MemoryStore;
use serde_json::Value;
use tokio::net::TcpListener;

pub const API_KEY: &str = "test-key";

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn spawn(gate: AuthGate) -> Result<TestServer> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test port")?;

    let state = AppState::new(Arc::new(MemoryStore::new()), gate);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    Ok(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    })
}

/// Server with the gate disabled, as in development mode
pub async fn open_server() -> Result<TestServer> {
    spawn(AuthGate::disabled()).await
}

/// Server accepting only [`API_KEY`] in the `key` header
pub async fn gated_server() -> Result<TestServer> {
    spawn(AuthGate::new("key", Arc::new(StaticKeyDirectory::new([API_KEY])))).await
}

/// Assert the envelope status matches the HTTP status and return the body
pub async fn envelope(res: reqwest::Response) -> Result<(u16, Value)> {
    let status = res.status().as_u16();
    let body = res.json::<Value>().await?;
    assert_eq!(
        body.get("status").and_then(Value::as_u64),
        Some(status as u64),
        "envelope status mismatch: {}",
        body
    );
    assert!(body.get("data").is_some(), "missing data field: {}", body);
    assert!(body.get("message").is_some(), "missing message field: {}", body);
    Ok((status, body))
}
