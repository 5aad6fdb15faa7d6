use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        description = "Procurement and inventory backend: suppliers, stock items, and purchase orders with automatic stock reconciliation on receipt"
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::update_password,
        crate::handlers::auth::list_users,
        crate::handlers::auth::get_user,
        crate::handlers::auth::update_user,
        crate::handlers::auth::delete_user,
        crate::handlers::inventory::list_items,
        crate::handlers::inventory::low_stock_alerts,
        crate::handlers::inventory::get_item,
        crate::handlers::inventory::create_item,
        crate::handlers::inventory::update_item,
        crate::handlers::inventory::delete_item,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order_status,
        crate::handlers::purchase_orders::delete_purchase_order,
        crate::handlers::health::health,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::users::UserRole,
        crate::entities::suppliers::PaymentTerms,
        crate::entities::inventory_items::ItemCategory,
        crate::entities::purchase_orders::PurchaseOrderStatus,
        crate::handlers::auth::RegisterRequest,
        crate::handlers::auth::LoginRequest,
        crate::handlers::auth::UpdatePasswordRequest,
        crate::handlers::auth::UpdateUserRequest,
        crate::handlers::auth::UserResponse,
        crate::handlers::auth::AuthData,
        crate::handlers::inventory::CreateItemRequest,
        crate::handlers::inventory::UpdateItemRequest,
        crate::handlers::inventory::ItemResponse,
        crate::handlers::suppliers::AddressPayload,
        crate::handlers::suppliers::CreateSupplierRequest,
        crate::handlers::suppliers::UpdateSupplierRequest,
        crate::handlers::suppliers::SupplierResponse,
        crate::handlers::purchase_orders::OrderLineRequest,
        crate::handlers::purchase_orders::CreatePurchaseOrderRequest,
        crate::handlers::purchase_orders::UpdatePurchaseOrderRequest,
        crate::handlers::purchase_orders::UpdateStatusRequest,
        crate::handlers::purchase_orders::OrderLineResponse,
        crate::handlers::purchase_orders::SupplierSummary,
        crate::handlers::purchase_orders::PurchaseOrderResponse,
    )),
    tags(
        (name = "auth", description = "Authentication and user management"),
        (name = "inventory", description = "Inventory item management"),
        (name = "suppliers", description = "Supplier management"),
        (name = "purchase-orders", description = "Purchase order workflow"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Swagger UI router serving the generated OpenAPI document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
