use super::common::{created_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::users::UserRole,
    errors::ApiError,
    handlers::AppState,
    services::purchase_orders::{
        CreatePurchaseOrderInput, OrderLineInput, OrderListFilter, PurchaseOrderDetails,
        UpdatePurchaseOrderInput,
    },
    Paginated,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, patch},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct OrderLineRequest {
    pub inventory_item_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Defaults to the item's current price when omitted
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: Uuid,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<OrderLineRequest>,
    pub expected_delivery_date: DateTime<Utc>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrderRequest {
    pub supplier_id: Option<Uuid>,
    pub items: Option<Vec<OrderLineRequest>>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    /// Draft, Pending, Approved, Received, or Cancelled
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub supplier_id: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    10
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub inventory_item_id: Uuid,
    pub item_name: String,
    pub sku: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierSummary {
    pub id: Uuid,
    pub supplier_name: String,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderResponse {
    pub id: Uuid,
    pub po_number: String,
    pub supplier_id: Uuid,
    pub supplier: Option<SupplierSummary>,
    pub items: Vec<OrderLineResponse>,
    pub total_amount: Decimal,
    pub status: String,
    pub order_date: DateTime<Utc>,
    pub expected_delivery_date: DateTime<Utc>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub received_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PurchaseOrderDetails> for PurchaseOrderResponse {
    fn from(details: PurchaseOrderDetails) -> Self {
        let order = details.order;
        Self {
            id: order.id,
            po_number: order.po_number,
            supplier_id: order.supplier_id,
            supplier: details.supplier.map(|supplier| SupplierSummary {
                id: supplier.id,
                supplier_name: supplier.supplier_name,
                email: supplier.email,
            }),
            items: details
                .lines
                .into_iter()
                .map(|line| OrderLineResponse {
                    inventory_item_id: line.inventory_item_id,
                    item_name: line.item_name,
                    sku: line.sku,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total_price: line.total_price,
                })
                .collect(),
            total_amount: order.total_amount,
            status: order.status,
            order_date: order.order_date,
            expected_delivery_date: order.expected_delivery_date,
            actual_delivery_date: order.actual_delivery_date,
            notes: order.notes,
            created_by: order.created_by,
            updated_by: order.updated_by,
            approved_by: order.approved_by,
            received_by: order.received_by,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

fn line_inputs(items: Vec<OrderLineRequest>) -> Vec<OrderLineInput> {
    items
        .into_iter()
        .map(|item| OrderLineInput {
            inventory_item_id: item.inventory_item_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect()
}

// Handler functions

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/purchase-orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Purchase orders", body = crate::ApiResponse<crate::Paginated<PurchaseOrderResponse>>)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (orders, total) = state
        .services
        .purchase_orders
        .list(OrderListFilter {
            status: query.status,
            supplier_id: query.supplier_id,
            search: query.search,
            sort_by: query.sort_by,
            order: query.order,
            page: query.page,
            limit: query.limit,
        })
        .await?;

    let items: Vec<PurchaseOrderResponse> = orders.into_iter().map(Into::into).collect();
    Ok(success_response(
        Paginated::new(items, total, query.page, query.limit),
        "Purchase orders retrieved successfully",
    ))
}

/// Get a purchase order by id
#[utoipa::path(
    get,
    path = "/api/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order", body = crate::ApiResponse<PurchaseOrderResponse>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let details = state.services.purchase_orders.get(order_id).await?;
    Ok(success_response(
        PurchaseOrderResponse::from(details),
        "Purchase order retrieved successfully",
    ))
}

/// Create a purchase order
#[utoipa::path(
    post,
    path = "/api/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created", body = crate::ApiResponse<PurchaseOrderResponse>),
        (status = 404, description = "Supplier or item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "PO number collision, retry", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin, UserRole::Manager])?;
    validate_input(&payload)?;

    let details = state
        .services
        .purchase_orders
        .create(
            CreatePurchaseOrderInput {
                supplier_id: payload.supplier_id,
                items: line_inputs(payload.items),
                expected_delivery_date: payload.expected_delivery_date,
                notes: payload.notes,
            },
            user.id,
        )
        .await?;

    info!(po_number = %details.order.po_number, "purchase order created");
    Ok(created_response(
        PurchaseOrderResponse::from(details),
        "Purchase order created successfully",
    ))
}

/// Update a purchase order (non-terminal only)
#[utoipa::path(
    put,
    path = "/api/purchase-orders/{id}",
    request_body = UpdatePurchaseOrderRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order updated", body = crate::ApiResponse<PurchaseOrderResponse>),
        (status = 400, description = "Order is Received or Cancelled", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin, UserRole::Manager])?;
    validate_input(&payload)?;

    let details = state
        .services
        .purchase_orders
        .update(
            order_id,
            UpdatePurchaseOrderInput {
                supplier_id: payload.supplier_id,
                items: payload.items.map(line_inputs),
                expected_delivery_date: payload.expected_delivery_date,
                notes: payload.notes,
            },
            user.id,
        )
        .await?;

    Ok(success_response(
        PurchaseOrderResponse::from(details),
        "Purchase order updated successfully",
    ))
}

/// Change a purchase order's status.
///
/// Transitioning to Received reconciles inventory: each line's item quantity
/// is incremented in the same transaction as the status write.
#[utoipa::path(
    patch,
    path = "/api/purchase-orders/{id}/status",
    request_body = UpdateStatusRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<PurchaseOrderResponse>),
        (status = 400, description = "Invalid status or terminal order", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent transition", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin, UserRole::Manager])?;
    validate_input(&payload)?;

    let details = state
        .services
        .purchase_orders
        .transition_status(order_id, &payload.status, user.id)
        .await?;

    let message = if details.order.status == "Received" {
        "Purchase order marked as received and inventory updated successfully"
    } else {
        "Purchase order status updated successfully"
    };

    info!(order_id = %order_id, status = %details.order.status, "purchase order status changed");
    Ok(success_response(PurchaseOrderResponse::from(details), message))
}

/// Delete a purchase order (admin, non-terminal only)
#[utoipa::path(
    delete,
    path = "/api/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order deleted", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Order is Received or Cancelled", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin])?;
    state.services.purchase_orders.delete(order_id).await?;
    Ok(success_response(
        serde_json::json!({}),
        "Purchase order deleted successfully",
    ))
}

/// Creates the router for purchase order endpoints
pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_order))
        .route(
            "/:id",
            get(get_purchase_order)
                .put(update_purchase_order)
                .delete(delete_purchase_order),
        )
        .route("/:id/status", patch(update_purchase_order_status))
}
