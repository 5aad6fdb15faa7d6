use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::inventory_items::{self, Entity as InventoryItems, ItemCategory},
    errors::ServiceError,
    services::{Page, SortOrder},
};

static SKU_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9-]+$").unwrap());

/// Normalizes a submitted SKU: trimmed, uppercased, and checked against the
/// allowed character set.
pub fn normalize_sku(raw: &str) -> Result<String, ServiceError> {
    let sku = raw.trim().to_uppercase();
    if sku.is_empty() || !SKU_PATTERN.is_match(&sku) {
        return Err(ServiceError::ValidationError(
            "SKU must contain only uppercase letters, numbers, and hyphens".to_string(),
        ));
    }
    Ok(sku)
}

#[derive(Debug, Clone)]
pub struct CreateItemInput {
    pub item_name: String,
    pub sku: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub category: Option<String>,
    pub reorder_level: Option<i32>,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateItemInput {
    pub item_name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub category: Option<String>,
    pub reorder_level: Option<i32>,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemListFilter {
    pub category: Option<String>,
    pub low_stock: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: u64,
    pub limit: u64,
}

/// Service for managing inventory items
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Atomic stock increment used by purchase-order receiving. A single
    /// `UPDATE ... SET quantity = quantity + ?` statement, so concurrent
    /// receipts touching the same item serialize at the row level instead of
    /// racing through an application-side read-modify-write. Returns the
    /// number of rows affected; zero means the item no longer exists.
    pub async fn apply_stock_increment<C: ConnectionTrait>(
        conn: &C,
        item_id: Uuid,
        delta: i32,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, ServiceError> {
        let result = InventoryItems::update_many()
            .col_expr(
                inventory_items::Column::Quantity,
                Expr::col(inventory_items::Column::Quantity).add(delta),
            )
            .col_expr(inventory_items::Column::UpdatedBy, Expr::value(actor_id))
            .col_expr(inventory_items::Column::UpdatedAt, Expr::value(now))
            .filter(inventory_items::Column::Id.eq(item_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    #[instrument(skip(self, input))]
    pub async fn create_item(
        &self,
        input: CreateItemInput,
        actor_id: Uuid,
    ) -> Result<inventory_items::Model, ServiceError> {
        let sku = normalize_sku(&input.sku)?;
        let category = parse_category(input.category.as_deref())?;
        validate_amounts(input.quantity, input.unit_price, input.reorder_level)?;

        // SKU uniqueness spans active and inactive items; the unique index
        // backstops this pre-check under concurrent creation.
        let existing = InventoryItems::find()
            .filter(inventory_items::Column::Sku.eq(sku.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "An item with this SKU already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let item = inventory_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_name: Set(input.item_name),
            sku: Set(sku.clone()),
            description: Set(input.description),
            quantity: Set(input.quantity),
            unit_price: Set(input.unit_price),
            category: Set(category.to_string()),
            reorder_level: Set(input.reorder_level.unwrap_or(10)),
            supplier_id: Set(input.supplier_id),
            is_active: Set(true),
            created_by: Set(actor_id),
            updated_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = item.insert(&*self.db).await.map_err(|e| {
            ServiceError::conflict_on_unique(e, "An item with this SKU already exists")
        })?;

        info!(sku = %sku, "inventory item created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        input: UpdateItemInput,
        actor_id: Uuid,
    ) -> Result<inventory_items::Model, ServiceError> {
        let item = self.get_item(item_id).await?;

        let sku = match input.sku {
            Some(raw) => {
                let sku = normalize_sku(&raw)?;
                if sku != item.sku {
                    let existing = InventoryItems::find()
                        .filter(inventory_items::Column::Sku.eq(sku.clone()))
                        .one(&*self.db)
                        .await?;
                    if existing.is_some() {
                        return Err(ServiceError::Conflict(
                            "An item with this SKU already exists".to_string(),
                        ));
                    }
                }
                Some(sku)
            }
            None => None,
        };

        let quantity = input.quantity.unwrap_or(item.quantity);
        let unit_price = input.unit_price.unwrap_or(item.unit_price);
        let reorder_level = input.reorder_level.unwrap_or(item.reorder_level);
        validate_amounts(quantity, unit_price, Some(reorder_level))?;

        let category = match input.category.as_deref() {
            Some(raw) => Some(parse_category(Some(raw))?.to_string()),
            None => None,
        };

        let mut active: inventory_items::ActiveModel = item.into();
        if let Some(name) = input.item_name {
            active.item_name = Set(name);
        }
        if let Some(sku) = sku {
            active.sku = Set(sku);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(category) = category {
            active.category = Set(category);
        }
        if let Some(supplier_id) = input.supplier_id {
            active.supplier_id = Set(Some(supplier_id));
        }
        active.quantity = Set(quantity);
        active.unit_price = Set(unit_price);
        active.reorder_level = Set(reorder_level);
        active.updated_by = Set(Some(actor_id));
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await.map_err(|e| {
            ServiceError::conflict_on_unique(e, "An item with this SKU already exists")
        })?;

        info!(item_id = %item_id, "inventory item updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<inventory_items::Model, ServiceError> {
        InventoryItems::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Inventory item not found".to_string()))
    }

    /// Lists active items with optional category/low-stock/search filters.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        filter: ItemListFilter,
    ) -> Result<(Vec<inventory_items::Model>, u64), ServiceError> {
        let page = Page::new(filter.page, filter.limit);
        let order = SortOrder::parse(filter.order.as_deref(), SortOrder::Desc)?;
        let column = sort_column(filter.sort_by.as_deref())?;

        let mut query =
            InventoryItems::find().filter(inventory_items::Column::IsActive.eq(true));

        if let Some(category) = filter.category.as_deref() {
            let category = parse_category(Some(category))?;
            query = query.filter(inventory_items::Column::Category.eq(category.to_string()));
        }
        if filter.low_stock == Some(true) {
            query = query.filter(
                Expr::col(inventory_items::Column::Quantity)
                    .lte(Expr::col(inventory_items::Column::ReorderLevel)),
            );
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(inventory_items::Column::ItemName.contains(search))
                    .add(inventory_items::Column::Sku.contains(search)),
            );
        }

        let total = query.clone().count(&*self.db).await?;
        let items = match order {
            SortOrder::Asc => query.order_by_asc(column),
            SortOrder::Desc => query.order_by_desc(column),
        }
        .limit(page.limit)
        .offset(page.offset())
        .all(&*self.db)
        .await?;

        Ok((items, total))
    }

    /// Active items at or below their reorder level.
    #[instrument(skip(self))]
    pub async fn low_stock_items(&self) -> Result<Vec<inventory_items::Model>, ServiceError> {
        let items = InventoryItems::find()
            .filter(inventory_items::Column::IsActive.eq(true))
            .filter(
                Expr::col(inventory_items::Column::Quantity)
                    .lte(Expr::col(inventory_items::Column::ReorderLevel)),
            )
            .order_by_asc(inventory_items::Column::Quantity)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    /// Soft delete: the row stays so purchase-order line snapshots keep a
    /// valid reference.
    #[instrument(skip(self))]
    pub async fn deactivate_item(
        &self,
        item_id: Uuid,
        actor_id: Uuid,
    ) -> Result<(), ServiceError> {
        let item = self.get_item(item_id).await?;
        let mut active: inventory_items::ActiveModel = item.into();
        active.is_active = Set(false);
        active.updated_by = Set(Some(actor_id));
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        info!(item_id = %item_id, "inventory item deactivated");
        Ok(())
    }
}

fn parse_category(raw: Option<&str>) -> Result<ItemCategory, ServiceError> {
    match raw {
        None => Ok(ItemCategory::default()),
        Some(value) => value.parse().map_err(|_| {
            ServiceError::ValidationError(format!("Invalid category: {value}"))
        }),
    }
}

fn validate_amounts(
    quantity: i32,
    unit_price: Decimal,
    reorder_level: Option<i32>,
) -> Result<(), ServiceError> {
    if quantity < 0 {
        return Err(ServiceError::ValidationError(
            "Quantity cannot be negative".to_string(),
        ));
    }
    if unit_price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Unit price cannot be negative".to_string(),
        ));
    }
    if reorder_level.is_some_and(|level| level < 0) {
        return Err(ServiceError::ValidationError(
            "Reorder level cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn sort_column(raw: Option<&str>) -> Result<inventory_items::Column, ServiceError> {
    match raw.unwrap_or("created_at") {
        "created_at" => Ok(inventory_items::Column::CreatedAt),
        "item_name" => Ok(inventory_items::Column::ItemName),
        "sku" => Ok(inventory_items::Column::Sku),
        "quantity" => Ok(inventory_items::Column::Quantity),
        "unit_price" => Ok(inventory_items::Column::UnitPrice),
        "category" => Ok(inventory_items::Column::Category),
        "reorder_level" => Ok(inventory_items::Column::ReorderLevel),
        other => Err(ServiceError::ValidationError(format!(
            "Invalid sort field '{other}'"
        ))),
    }
}
