use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Payment terms offered by a supplier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, utoipa::ToSchema,
)]
pub enum PaymentTerms {
    #[strum(serialize = "Net 15")]
    #[serde(rename = "Net 15")]
    Net15,
    #[strum(serialize = "Net 30")]
    #[serde(rename = "Net 30")]
    Net30,
    #[strum(serialize = "Net 45")]
    #[serde(rename = "Net 45")]
    Net45,
    #[strum(serialize = "Net 60")]
    #[serde(rename = "Net 60")]
    Net60,
    #[strum(serialize = "Due on Receipt")]
    #[serde(rename = "Due on Receipt")]
    DueOnReceipt,
    Custom,
}

impl Default for PaymentTerms {
    fn default() -> Self {
        PaymentTerms::Net30
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub supplier_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_items::Entity")]
    InventoryItems,
    #[sea_orm(has_many = "super::purchase_orders::Entity")]
    PurchaseOrders,
}

impl Related<super::inventory_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItems.def()
    }
}

impl Related<super::purchase_orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
