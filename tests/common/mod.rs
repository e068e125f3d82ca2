//! Shared helpers for integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use bungalow::config::StoreBackend;
use bungalow::{AppState, Config, MemoryStore};
use tower::ServiceExt;

/// Configuration for running against the in-memory store.
pub fn memory_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        ..Config::default()
    }
}

/// Fresh state over a fresh memory store, with a handle on the store.
pub fn memory_state() -> (AppState, Arc<MemoryStore>) {
    memory_state_with(memory_config())
}

pub fn memory_state_with(config: Config) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (AppState::new(store.clone(), config), store)
}

/// A captured response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("response body should be UTF-8")
    }
}

/// Send one request through `router`.
pub async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Value of the first sample of metric `name` whose labels contain all of `labels`.
pub fn sample(rendered: &str, name: &str, labels: &[&str]) -> Option<f64> {
    samples(rendered, name)
        .find(|line| labels.iter().all(|label| line.contains(label)))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

/// Every sample line of metric `name`.
pub fn samples<'a>(rendered: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter(move |line| {
            line.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
}
