use super::common::{created_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::{inventory_items, users::UserRole},
    errors::ApiError,
    handlers::AppState,
    services::inventory::{CreateItemInput, ItemListFilter, UpdateItemInput},
    Paginated,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 2, max = 100))]
    pub item_name: String,
    #[validate(length(min = 1))]
    pub sku: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub category: Option<String>,
    #[validate(range(min = 0))]
    pub reorder_level: Option<i32>,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 2, max = 100))]
    pub item_name: Option<String>,
    #[validate(length(min = 1))]
    pub sku: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub category: Option<String>,
    #[validate(range(min = 0))]
    pub reorder_level: Option<i32>,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ItemListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub low_stock: Option<bool>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    10
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub item_name: String,
    pub sku: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub category: String,
    pub reorder_level: i32,
    pub supplier_id: Option<Uuid>,
    /// quantity <= reorder_level
    pub is_low_stock: bool,
    pub is_active: bool,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<inventory_items::Model> for ItemResponse {
    fn from(item: inventory_items::Model) -> Self {
        let is_low_stock = item.is_low_stock();
        Self {
            id: item.id,
            item_name: item.item_name,
            sku: item.sku,
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            category: item.category,
            reorder_level: item.reorder_level,
            supplier_id: item.supplier_id,
            is_low_stock,
            is_active: item.is_active,
            created_by: item.created_by,
            updated_by: item.updated_by,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

// Handler functions

/// List active inventory items
#[utoipa::path(
    get,
    path = "/api/inventory",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Inventory items", body = crate::ApiResponse<crate::Paginated<ItemResponse>>)
    ),
    tag = "inventory"
)]
pub async fn list_items(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ItemListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (items, total) = state
        .services
        .inventory
        .list_items(ItemListFilter {
            category: query.category,
            low_stock: query.low_stock,
            search: query.search,
            sort_by: query.sort_by,
            order: query.order,
            page: query.page,
            limit: query.limit,
        })
        .await?;

    let items: Vec<ItemResponse> = items.into_iter().map(Into::into).collect();
    Ok(success_response(
        Paginated::new(items, total, query.page, query.limit),
        "Inventory items retrieved successfully",
    ))
}

/// Active items at or below their reorder level
#[utoipa::path(
    get,
    path = "/api/inventory/alerts/low-stock",
    responses(
        (status = 200, description = "Low stock items", body = crate::ApiResponse<Vec<ItemResponse>>)
    ),
    tag = "inventory"
)]
pub async fn low_stock_alerts(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let items = state.services.inventory.low_stock_items().await?;
    let items: Vec<ItemResponse> = items.into_iter().map(Into::into).collect();
    Ok(success_response(
        items,
        "Low stock items retrieved successfully",
    ))
}

/// Get an inventory item by id
#[utoipa::path(
    get,
    path = "/api/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Inventory item", body = crate::ApiResponse<ItemResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state.services.inventory.get_item(item_id).await?;
    Ok(success_response(
        ItemResponse::from(item),
        "Inventory item retrieved successfully",
    ))
}

/// Create an inventory item
#[utoipa::path(
    post,
    path = "/api/inventory",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = crate::ApiResponse<ItemResponse>),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin, UserRole::Manager])?;
    validate_input(&payload)?;

    let item = state
        .services
        .inventory
        .create_item(
            CreateItemInput {
                item_name: payload.item_name,
                sku: payload.sku,
                description: payload.description,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
                category: payload.category,
                reorder_level: payload.reorder_level,
                supplier_id: payload.supplier_id,
            },
            user.id,
        )
        .await?;

    Ok(created_response(
        ItemResponse::from(item),
        "Inventory item created successfully",
    ))
}

/// Update an inventory item
#[utoipa::path(
    put,
    path = "/api/inventory/{id}",
    request_body = UpdateItemRequest,
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Item updated", body = crate::ApiResponse<ItemResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin, UserRole::Manager])?;
    validate_input(&payload)?;

    let item = state
        .services
        .inventory
        .update_item(
            item_id,
            UpdateItemInput {
                item_name: payload.item_name,
                sku: payload.sku,
                description: payload.description,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
                category: payload.category,
                reorder_level: payload.reorder_level,
                supplier_id: payload.supplier_id,
            },
            user.id,
        )
        .await?;

    Ok(success_response(
        ItemResponse::from(item),
        "Inventory item updated successfully",
    ))
}

/// Deactivate an inventory item (admin, soft delete)
#[utoipa::path(
    delete,
    path = "/api/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Item deactivated", body = crate::ApiResponse<serde_json::Value>),
        (status = 403, description = "Admin only", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin])?;
    state
        .services
        .inventory
        .deactivate_item(item_id, user.id)
        .await?;
    Ok(success_response(
        serde_json::json!({}),
        "Inventory item deleted successfully",
    ))
}

/// Creates the router for inventory endpoints
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/alerts/low-stock", get(low_stock_alerts))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
}
