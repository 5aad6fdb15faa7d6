#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use stockroom_api::{api_routes, config::AppConfig, db, handlers, AppState};

/// Reads a monetary field regardless of whether the serializer emitted a
/// JSON number or a decimal string.
pub fn money(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.as_f64().expect("decimal number"),
        other => panic!("expected decimal value, got {other}"),
    }
}

/// Helper harness spinning up the application router over an in-memory
/// SQLite database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        // An in-memory SQLite database lives per connection; a
        // single-connection pool keeps every query on the same database.
        let db_cfg = db::DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = Router::new()
            .route("/health", get(handlers::health::health))
            .nest("/api", api_routes())
            .with_state(state.clone());

        Self { router, state }
    }

    /// Issues a request against the router and returns status + parsed body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request build"),
            None => builder.body(Body::empty()).expect("request build"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body read")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Registers a user with the given role, returning (token, user id).
    pub async fn register_user(&self, name: &str, email: &str, role: &str) -> (String, Uuid) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": "Password123!",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let token = body["data"]["token"].as_str().expect("token").to_string();
        let id = Uuid::parse_str(body["data"]["user"]["id"].as_str().expect("user id"))
            .expect("uuid");
        (token, id)
    }

    /// Creates a supplier and returns its id.
    pub async fn create_supplier(&self, token: &str, name: &str) -> Uuid {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/suppliers",
                Some(token),
                Some(json!({
                    "supplier_name": name,
                    "contact_person": "Jane Smith",
                    "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                    "phone": "+1-555-0100",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create supplier failed: {body}");
        Uuid::parse_str(body["data"]["id"].as_str().expect("supplier id")).expect("uuid")
    }

    /// Creates an inventory item and returns its id.
    pub async fn create_item(
        &self,
        token: &str,
        name: &str,
        sku: &str,
        quantity: i64,
        unit_price: f64,
        reorder_level: i64,
    ) -> Uuid {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/inventory",
                Some(token),
                Some(json!({
                    "item_name": name,
                    "sku": sku,
                    "quantity": quantity,
                    "unit_price": unit_price,
                    "reorder_level": reorder_level,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create item failed: {body}");
        Uuid::parse_str(body["data"]["id"].as_str().expect("item id")).expect("uuid")
    }
}
