//! Stockroom API Library
//!
//! Procurement and inventory backend: suppliers, stock items, and purchase
//! orders with automatic stock reconciliation when an order is received.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth_service: Arc<auth::AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth_service = Arc::new(auth::AuthService::new(
            &config.jwt_secret,
            config.jwt_expiration,
        ));
        let services = handlers::AppServices::new(db.clone());
        Self {
            db,
            config,
            auth_service,
            services,
        }
    }
}

/// Success envelope returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always "success"
    pub status: String,
    pub data: T,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            data,
            message: message.into(),
        }
    }
}

/// Pagination block for list endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct PageInfo {
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

/// Paginated list payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let window = services::Page::new(page, limit);
        Self {
            items,
            pagination: PageInfo {
                total,
                page: window.page,
                pages: window.pages(total),
            },
        }
    }
}

/// Full /api router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/inventory", handlers::inventory::inventory_routes())
        .nest("/suppliers", handlers::suppliers::supplier_routes())
        .nest(
            "/purchase-orders",
            handlers::purchase_orders::purchase_order_routes(),
        )
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let response = ApiResponse::success(serde_json::json!({"id": 1}), "ok");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["id"], 1);
        assert_eq!(value["message"], "ok");
    }

    #[test]
    fn paginated_envelope_computes_pages() {
        let paginated = Paginated::new(vec![1, 2, 3], 23, 2, 10);
        let value = serde_json::to_value(&paginated).unwrap();
        assert_eq!(value["pagination"]["total"], 23);
        assert_eq!(value["pagination"]["page"], 2);
        assert_eq!(value["pagination"]["pages"], 3);
    }
}
