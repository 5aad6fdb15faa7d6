use super::common::{created_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::{suppliers, users::UserRole},
    errors::ApiError,
    handlers::AppState,
    services::suppliers::{
        AddressInput, CreateSupplierInput, SupplierListFilter, UpdateSupplierInput,
    },
    Paginated,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddressPayload {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 2, max = 100))]
    pub supplier_name: String,
    #[validate(length(min = 2, max = 50))]
    pub contact_person: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5, max = 30))]
    pub phone: String,
    #[validate]
    pub address: Option<AddressPayload>,
    pub tax_id: Option<String>,
    /// Net 15, Net 30, Net 45, Net 60, Due on Receipt, or Custom
    pub payment_terms: Option<String>,
    pub rating: Option<i16>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 2, max = 100))]
    pub supplier_name: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 30))]
    pub phone: Option<String>,
    #[validate]
    pub address: Option<AddressPayload>,
    pub tax_id: Option<String>,
    pub payment_terms: Option<String>,
    pub rating: Option<i16>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SupplierListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    10
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierResponse {
    pub id: Uuid,
    pub supplier_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub address: AddressPayload,
    pub tax_id: Option<String>,
    pub payment_terms: String,
    pub rating: i16,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<suppliers::Model> for SupplierResponse {
    fn from(supplier: suppliers::Model) -> Self {
        Self {
            id: supplier.id,
            supplier_name: supplier.supplier_name,
            contact_person: supplier.contact_person,
            email: supplier.email,
            phone: supplier.phone,
            address: AddressPayload {
                street: supplier.street,
                city: supplier.city,
                state: supplier.state,
                country: supplier.country,
                postal_code: supplier.postal_code,
            },
            tax_id: supplier.tax_id,
            payment_terms: supplier.payment_terms,
            rating: supplier.rating,
            is_active: supplier.is_active,
            notes: supplier.notes,
            created_by: supplier.created_by,
            updated_by: supplier.updated_by,
            created_at: supplier.created_at,
            updated_at: supplier.updated_at,
        }
    }
}

fn address_input(payload: Option<AddressPayload>) -> Option<AddressInput> {
    payload.map(|address| AddressInput {
        street: address.street,
        city: address.city,
        state: address.state,
        country: address.country,
        postal_code: address.postal_code,
    })
}

// Handler functions

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/suppliers",
    params(SupplierListQuery),
    responses(
        (status = 200, description = "Suppliers", body = crate::ApiResponse<crate::Paginated<SupplierResponse>>)
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<SupplierListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (items, total) = state
        .services
        .suppliers
        .list_suppliers(SupplierListFilter {
            is_active: query.is_active,
            search: query.search,
            sort_by: query.sort_by,
            order: query.order,
            page: query.page,
            limit: query.limit,
        })
        .await?;

    let items: Vec<SupplierResponse> = items.into_iter().map(Into::into).collect();
    Ok(success_response(
        Paginated::new(items, total, query.page, query.limit),
        "Suppliers retrieved successfully",
    ))
}

/// Get a supplier by id
#[utoipa::path(
    get,
    path = "/api/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier", body = crate::ApiResponse<SupplierResponse>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let supplier = state.services.suppliers.get_supplier(supplier_id).await?;
    Ok(success_response(
        SupplierResponse::from(supplier),
        "Supplier retrieved successfully",
    ))
}

/// Create a supplier
#[utoipa::path(
    post,
    path = "/api/suppliers",
    request_body = CreateSupplierRequest,
    responses(
        (status = 201, description = "Supplier created", body = crate::ApiResponse<SupplierResponse>),
        (status = 409, description = "Duplicate tax ID", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin, UserRole::Manager])?;
    validate_input(&payload)?;

    let supplier = state
        .services
        .suppliers
        .create_supplier(
            CreateSupplierInput {
                supplier_name: payload.supplier_name,
                contact_person: payload.contact_person,
                email: payload.email,
                phone: payload.phone,
                address: address_input(payload.address),
                tax_id: payload.tax_id,
                payment_terms: payload.payment_terms,
                rating: payload.rating,
                notes: payload.notes,
            },
            user.id,
        )
        .await?;

    Ok(created_response(
        SupplierResponse::from(supplier),
        "Supplier created successfully",
    ))
}

/// Update a supplier
#[utoipa::path(
    put,
    path = "/api/suppliers/{id}",
    request_body = UpdateSupplierRequest,
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier updated", body = crate::ApiResponse<SupplierResponse>),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(supplier_id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin, UserRole::Manager])?;
    validate_input(&payload)?;

    let supplier = state
        .services
        .suppliers
        .update_supplier(
            supplier_id,
            UpdateSupplierInput {
                supplier_name: payload.supplier_name,
                contact_person: payload.contact_person,
                email: payload.email,
                phone: payload.phone,
                address: address_input(payload.address),
                tax_id: payload.tax_id,
                payment_terms: payload.payment_terms,
                rating: payload.rating,
                notes: payload.notes,
            },
            user.id,
        )
        .await?;

    Ok(success_response(
        SupplierResponse::from(supplier),
        "Supplier updated successfully",
    ))
}

/// Deactivate a supplier (admin, soft delete)
#[utoipa::path(
    delete,
    path = "/api/suppliers/{id}",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier deactivated", body = crate::ApiResponse<serde_json::Value>),
        (status = 403, description = "Admin only", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin])?;
    state
        .services
        .suppliers
        .deactivate_supplier(supplier_id, user.id)
        .await?;
    Ok(success_response(
        serde_json::json!({}),
        "Supplier deleted successfully",
    ))
}

/// Creates the router for supplier endpoints
pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:id",
            get(get_supplier)
                .put(update_supplier)
                .delete(delete_supplier),
        )
}
