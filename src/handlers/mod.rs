pub mod auth;
pub mod common;
pub mod health;
pub mod inventory;
pub mod purchase_orders;
pub mod suppliers;

use crate::db::DbPool;
use crate::services::{
    inventory::InventoryService, purchase_orders::PurchaseOrderService,
    suppliers::SupplierService, users::UserService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: UserService,
    pub suppliers: SupplierService,
    pub inventory: InventoryService,
    pub purchase_orders: PurchaseOrderService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            users: UserService::new(db.clone()),
            suppliers: SupplierService::new(db.clone()),
            inventory: InventoryService::new(db.clone()),
            purchase_orders: PurchaseOrderService::new(db),
        }
    }
}
