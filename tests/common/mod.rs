#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use sightings::config::Config;
use sightings::db;
use sightings::routes::build_router;
use sightings::state::AppState;

/// Router over a fresh on-disk database. The temp dir lives as long as this.
pub struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::create_pool(&dir.path().join("test.db")).expect("create test database");
        db::run_migrations(&pool).expect("run migrations");

        let state = AppState::new(pool, Config::default());
        Self {
            router: build_router(state),
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        split(response).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(empty_request("GET", uri)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(empty_request("DELETE", uri)).await
    }

    pub async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request(method, uri, &body)).await
    }
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn split(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON body")
    };
    (status, json)
}
