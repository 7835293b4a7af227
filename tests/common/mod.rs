#![allow(dead_code)]

use assetdesk::api::AppState;
use assetdesk::config::Config;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "password";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.db_path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Each app gets its own sqlite file so pooled connections share one schema.
pub async fn spawn_app() -> TestApp {
    let db_path =
        std::env::temp_dir().join(format!("assetdesk-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}?mode=rwc", db_path.display());
    config.security.jwt_secret = "integration-test-secret".to_string();

    let state = assetdesk::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let router = assetdesk::api::router(state.clone()).await;

    TestApp {
        router,
        state,
        db_path,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn create_unit(&self, token: &str, name: &str) -> i64 {
        let (status, body) = self
            .post("/api/units", token, json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_item(&self, token: &str, unit_id: i64, description: &str, quantity: i32) -> i64 {
        let (status, body) = self
            .post(
                "/api/items",
                token,
                json!({
                    "description": description,
                    "unit_of_measure": "un",
                    "quantity": quantity,
                    "unit_price": 1.5,
                    "unit_id": unit_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_printer(
        &self,
        token: &str,
        name: &str,
        serial_number: &str,
        ip: &str,
        unit_id: Option<i64>,
    ) -> i64 {
        let (status, body) = self
            .post(
                "/api/printers/printers",
                token,
                json!({
                    "name": name,
                    "serial_number": serial_number,
                    "ip": ip,
                    "unit_id": unit_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    /// Creates an account through the API and returns `(id, token)`.
    pub async fn create_user(
        &self,
        admin_token: &str,
        username: &str,
        role: &str,
        unit_id: Option<i64>,
    ) -> (i64, String) {
        let (status, body) = self
            .post(
                "/api/users",
                admin_token,
                json!({
                    "username": username,
                    "full_name": format!("{username} test"),
                    "role": role,
                    "password": "secret123",
                    "unit_id": unit_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let id = body["data"]["id"].as_i64().unwrap();
        let token = self.login(username, "secret123").await;
        (id, token)
    }

    pub async fn item_quantity(&self, token: &str, item_id: i64) -> i64 {
        let (status, body) = self.get(&format!("/api/items/{item_id}"), token).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["quantity"].as_i64().unwrap()
    }
}
