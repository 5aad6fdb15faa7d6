use super::common::{created_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::users::{self, UserRole},
    errors::ApiError,
    handlers::AppState,
    services::users::{RegisterUserInput, UpdateUserInput, UserListFilter},
    Paginated,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    /// Minimum 8 characters
    #[validate(length(min = 8))]
    pub password: String,
    /// Admin, Manager, or Staff; defaults to Staff
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 50))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    10
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        let role = user.user_role();
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthData {
    pub user: UserResponse,
    pub token: String,
}

// Handler functions

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = crate::ApiResponse<AuthData>),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .register(RegisterUserInput {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            role: payload.role,
        })
        .await?;

    let token = state.auth_service.generate_token(user.id)?;
    info!(user_id = %user.id, "user registered");

    Ok(created_response(
        AuthData {
            user: user.into(),
            token,
        },
        "User registered successfully",
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::ApiResponse<AuthData>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;
    let token = state.auth_service.generate_token(user.id)?;

    Ok(success_response(
        AuthData {
            user: user.into(),
            token,
        },
        "Login successful",
    ))
}

/// Current user profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current profile", body = crate::ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let profile = state.services.users.get_user(user.id).await?;
    Ok(success_response(
        UserResponse::from(profile),
        "User profile retrieved successfully",
    ))
}

/// Change the current user's password; returns a fresh token
#[utoipa::path(
    put,
    path = "/api/auth/update-password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 401, description = "Current password incorrect", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn update_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .users
        .update_password(user.id, &payload.current_password, &payload.new_password)
        .await?;
    let token = state.auth_service.generate_token(user.id)?;

    Ok(success_response(
        serde_json::json!({ "token": token }),
        "Password updated successfully",
    ))
}

/// List users (admin)
#[utoipa::path(
    get,
    path = "/api/auth/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = crate::ApiResponse<crate::Paginated<UserResponse>>),
        (status = 403, description = "Admin only", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin])?;

    let (items, total) = state
        .services
        .users
        .list_users(UserListFilter {
            role: query.role,
            is_active: query.is_active,
            search: query.search,
            sort_by: query.sort_by,
            order: query.order,
            page: query.page,
            limit: query.limit,
        })
        .await?;

    let items: Vec<UserResponse> = items.into_iter().map(Into::into).collect();
    Ok(success_response(
        Paginated::new(items, total, query.page, query.limit),
        "Users retrieved successfully",
    ))
}

/// Get a user by id (admin)
#[utoipa::path(
    get,
    path = "/api/auth/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = crate::ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin])?;
    let found = state.services.users.get_user(user_id).await?;
    Ok(success_response(
        UserResponse::from(found),
        "User retrieved successfully",
    ))
}

/// Update a user (admin)
#[utoipa::path(
    put,
    path = "/api/auth/users/{id}",
    request_body = UpdateUserRequest,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User updated", body = crate::ApiResponse<UserResponse>),
        (status = 409, description = "Email already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin])?;
    validate_input(&payload)?;

    let updated = state
        .services
        .users
        .update_user(
            user_id,
            UpdateUserInput {
                name: payload.name,
                email: payload.email,
                role: payload.role,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(success_response(
        UserResponse::from(updated),
        "User updated successfully",
    ))
}

/// Deactivate a user (admin, soft delete)
#[utoipa::path(
    delete,
    path = "/api/auth/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Cannot delete own account", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    user.require_any(&[UserRole::Admin])?;
    state.services.users.deactivate_user(user_id, user.id).await?;
    Ok(success_response(
        serde_json::json!({}),
        "User deleted successfully",
    ))
}

/// Creates the router for auth and user-management endpoints
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/update-password", put(update_password))
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}
