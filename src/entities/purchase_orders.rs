use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter as StrumEnumIter, EnumString};

/// Purchase order lifecycle states.
///
/// Draft -> Pending -> Approved -> Received is the happy path; Cancelled is
/// reachable from any non-terminal state. Received and Cancelled are
/// terminal: no further status change, update, or deletion is permitted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    StrumEnumIter,
    utoipa::ToSchema,
)]
pub enum PurchaseOrderStatus {
    Draft,
    Pending,
    Approved,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Received | Self::Cancelled)
    }
}

impl Default for PurchaseOrderStatus {
    fn default() -> Self {
        PurchaseOrderStatus::Draft
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub po_number: String,
    pub supplier_id: Uuid,
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::suppliers::Entity",
        from = "Column::SupplierId",
        to = "super::suppliers::Column::Id"
    )]
    Supplier,
    #[sea_orm(has_many = "super::purchase_order_lines::Entity")]
    Lines,
}

impl Related<super::suppliers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::purchase_order_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::PurchaseOrderStatus;
    use strum::IntoEnumIterator;

    #[test]
    fn only_received_and_cancelled_are_terminal() {
        for status in PurchaseOrderStatus::iter() {
            let expected = matches!(
                status,
                PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled
            );
            assert_eq!(status.is_terminal(), expected, "{status}");
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in PurchaseOrderStatus::iter() {
            let parsed: PurchaseOrderStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("Shipped".parse::<PurchaseOrderStatus>().is_err());
    }
}
