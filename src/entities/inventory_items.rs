use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stock categories recognized by the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, utoipa::ToSchema,
)]
pub enum ItemCategory {
    #[strum(serialize = "Raw Material")]
    #[serde(rename = "Raw Material")]
    RawMaterial,
    #[strum(serialize = "Finished Goods")]
    #[serde(rename = "Finished Goods")]
    FinishedGoods,
    Components,
    Supplies,
    #[strum(serialize = "Food & Beverage")]
    #[serde(rename = "Food & Beverage")]
    FoodBeverage,
    Other,
}

impl Default for ItemCategory {
    fn default() -> Self {
        ItemCategory::Other
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_name: String,
    pub sku: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub category: String,
    pub reorder_level: i32,
    pub supplier_id: Option<Uuid>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// An item sitting at its reorder level counts as low stock.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::suppliers::Entity",
        from = "Column::SupplierId",
        to = "super::suppliers::Column::Id"
    )]
    Supplier,
    #[sea_orm(has_many = "super::purchase_order_lines::Entity")]
    PurchaseOrderLines,
}

impl Related<super::suppliers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::purchase_order_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: i32, reorder_level: i32) -> Model {
        Model {
            id: Uuid::new_v4(),
            item_name: "Hex bolts M8".into(),
            sku: "BOLT-M8".into(),
            description: None,
            quantity,
            unit_price: dec!(0.35),
            category: ItemCategory::Components.to_string(),
            reorder_level,
            supplier_id: None,
            is_active: true,
            created_by: Uuid::new_v4(),
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_includes_boundary() {
        assert!(item(9, 10).is_low_stock());
        assert!(item(10, 10).is_low_stock());
        assert!(!item(11, 10).is_low_stock());
    }
}
