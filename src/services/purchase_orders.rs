use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        inventory_items,
        purchase_order_lines::{self, Entity as PurchaseOrderLines},
        purchase_orders::{self, Entity as PurchaseOrders, PurchaseOrderStatus},
        suppliers,
    },
    errors::ServiceError,
    services::{inventory::InventoryService, Page, SortOrder},
};

#[derive(Debug, Clone)]
pub struct OrderLineInput {
    pub inventory_item_id: Uuid,
    pub quantity: i32,
    /// Defaults to the item's current price when omitted.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub items: Vec<OrderLineInput>,
    pub expected_delivery_date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePurchaseOrderInput {
    pub supplier_id: Option<Uuid>,
    pub items: Option<Vec<OrderLineInput>>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderListFilter {
    pub status: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: u64,
    pub limit: u64,
}

/// A purchase order with its display references resolved.
#[derive(Debug, Clone)]
pub struct PurchaseOrderDetails {
    pub order: purchase_orders::Model,
    pub supplier: Option<suppliers::Model>,
    pub lines: Vec<purchase_order_lines::Model>,
}

/// A line enriched against its inventory item: name/sku snapshotted, price
/// defaulted, totals recomputed.
#[derive(Debug, Clone)]
struct EnrichedLine {
    inventory_item_id: Uuid,
    item_name: String,
    sku: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
}

/// Parses a requested status string, rejecting unrecognized values.
pub fn parse_status(raw: &str) -> Result<PurchaseOrderStatus, ServiceError> {
    raw.parse().map_err(|_| {
        ServiceError::ValidationError(
            "Invalid status. Must be one of: Draft, Pending, Approved, Received, Cancelled"
                .to_string(),
        )
    })
}

fn stored_status(order: &purchase_orders::Model) -> Result<PurchaseOrderStatus, ServiceError> {
    order.status.parse().map_err(|_| {
        ServiceError::InternalError(format!(
            "purchase order {} has unrecognized status '{}'",
            order.id, order.status
        ))
    })
}

/// Pricing normalization: recomputes every line total and the order total
/// from quantity x unit price, overriding whatever the caller supplied.
fn recompute_totals(lines: &mut [EnrichedLine]) -> Decimal {
    let mut total = Decimal::ZERO;
    for line in lines.iter_mut() {
        line.total_price = Decimal::from(line.quantity) * line.unit_price;
        total += line.total_price;
    }
    total
}

/// `PO-{YYYY}{MM}` prefix for the month of `now`.
fn month_prefix(now: DateTime<Utc>) -> String {
    format!("PO-{}{:02}", now.year(), now.month())
}

fn format_po_number(prefix: &str, sequence: u32) -> String {
    format!("{prefix}-{sequence:04}")
}

/// Extracts the numeric suffix of a PO number.
fn parse_sequence(po_number: &str) -> Option<u32> {
    po_number.rsplit('-').next()?.parse().ok()
}

/// Derives the next month-scoped PO number from stored data. Two concurrent
/// creations can compute the same candidate; the unique index on po_number
/// turns the loser into a conflict for the caller to retry.
async fn next_po_number<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let prefix = month_prefix(now);
    let last = PurchaseOrders::find()
        .filter(purchase_orders::Column::PoNumber.like(format!("{prefix}-%")))
        .order_by_desc(purchase_orders::Column::PoNumber)
        .one(conn)
        .await?;

    let sequence = last
        .as_ref()
        .and_then(|po| parse_sequence(&po.po_number))
        .unwrap_or(0)
        + 1;
    Ok(format_po_number(&prefix, sequence))
}

async fn enrich_lines<C: ConnectionTrait>(
    conn: &C,
    inputs: &[OrderLineInput],
) -> Result<Vec<EnrichedLine>, ServiceError> {
    let mut lines = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        let item = inventory_items::Entity::find_by_id(input.inventory_item_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Inventory item with ID {} not found",
                    input.inventory_item_id
                ))
            })?;

        let unit_price = input.unit_price.unwrap_or(item.unit_price);
        if unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Unit price cannot be negative".to_string(),
            ));
        }

        lines.push(EnrichedLine {
            inventory_item_id: item.id,
            item_name: item.item_name,
            sku: item.sku,
            quantity: input.quantity,
            unit_price,
            total_price: Decimal::ZERO,
        });
    }
    Ok(lines)
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    lines: &[EnrichedLine],
) -> Result<(), ServiceError> {
    let models: Vec<purchase_order_lines::ActiveModel> = lines
        .iter()
        .enumerate()
        .map(|(index, line)| purchase_order_lines::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(order_id),
            line_number: Set(index as i32 + 1),
            inventory_item_id: Set(line.inventory_item_id),
            item_name: Set(line.item_name.clone()),
            sku: Set(line.sku.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            total_price: Set(line.total_price),
        })
        .collect();
    PurchaseOrderLines::insert_many(models).exec(conn).await?;
    Ok(())
}

/// Service for managing purchase orders
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DatabaseConnection>,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreatePurchaseOrderInput,
        actor_id: Uuid,
    ) -> Result<PurchaseOrderDetails, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one item is required".to_string(),
            ));
        }
        let now = Utc::now();
        if input.expected_delivery_date < now {
            return Err(ServiceError::ValidationError(
                "Expected delivery date must be in the future".to_string(),
            ));
        }

        suppliers::Entity::find_by_id(input.supplier_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Supplier not found".to_string()))?;

        let txn = self.db.begin().await?;

        let mut lines = enrich_lines(&txn, &input.items).await?;
        let total_amount = recompute_totals(&mut lines);
        let po_number = next_po_number(&txn, now).await?;

        let order_id = Uuid::new_v4();
        let order = purchase_orders::ActiveModel {
            id: Set(order_id),
            po_number: Set(po_number.clone()),
            supplier_id: Set(input.supplier_id),
            total_amount: Set(total_amount),
            status: Set(PurchaseOrderStatus::Draft.to_string()),
            order_date: Set(now),
            expected_delivery_date: Set(input.expected_delivery_date),
            actual_delivery_date: Set(None),
            notes: Set(input.notes),
            created_by: Set(actor_id),
            updated_by: Set(None),
            approved_by: Set(None),
            received_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        order.insert(&txn).await.map_err(|e| {
            ServiceError::conflict_on_unique(
                e,
                "A purchase order with this number was just created; please retry",
            )
        })?;

        insert_lines(&txn, order_id, &lines).await?;
        txn.commit().await?;

        info!(po_number = %po_number, "purchase order created");
        self.get(order_id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        order_id: Uuid,
        input: UpdatePurchaseOrderInput,
        actor_id: Uuid,
    ) -> Result<PurchaseOrderDetails, ServiceError> {
        let order = self.find_order(order_id).await?;
        let current = stored_status(&order)?;
        if current.is_terminal() {
            return Err(ServiceError::ValidationError(format!(
                "Cannot update purchase order with status: {current}"
            )));
        }

        if let Some(date) = input.expected_delivery_date {
            if date < Utc::now() {
                return Err(ServiceError::ValidationError(
                    "Expected delivery date must be in the future".to_string(),
                ));
            }
        }
        if let Some(supplier_id) = input.supplier_id {
            suppliers::Entity::find_by_id(supplier_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Supplier not found".to_string()))?;
        }

        let txn = self.db.begin().await?;

        // Totals are re-derived on every save, whether or not the line set
        // changed; caller-supplied totals are never trusted.
        let total_amount = match &input.items {
            Some(items) => {
                if items.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "At least one item is required".to_string(),
                    ));
                }
                let mut lines = enrich_lines(&txn, items).await?;
                let total = recompute_totals(&mut lines);
                PurchaseOrderLines::delete_many()
                    .filter(purchase_order_lines::Column::PurchaseOrderId.eq(order_id))
                    .exec(&txn)
                    .await?;
                insert_lines(&txn, order_id, &lines).await?;
                total
            }
            None => {
                let stored = PurchaseOrderLines::find()
                    .filter(purchase_order_lines::Column::PurchaseOrderId.eq(order_id))
                    .order_by_asc(purchase_order_lines::Column::LineNumber)
                    .all(&txn)
                    .await?;
                let mut total = Decimal::ZERO;
                for line in stored {
                    let line_total = Decimal::from(line.quantity) * line.unit_price;
                    total += line_total;
                    if line.total_price != line_total {
                        let mut active: purchase_order_lines::ActiveModel = line.into();
                        active.total_price = Set(line_total);
                        active.update(&txn).await?;
                    }
                }
                total
            }
        };

        let mut active: purchase_orders::ActiveModel = order.into();
        if let Some(supplier_id) = input.supplier_id {
            active.supplier_id = Set(supplier_id);
        }
        if let Some(date) = input.expected_delivery_date {
            active.expected_delivery_date = Set(date);
        }
        if let Some(notes) = input.notes {
            active.notes = Set(Some(notes));
        }
        active.total_amount = Set(total_amount);
        active.updated_by = Set(Some(actor_id));
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, "purchase order updated");
        self.get(order_id).await
    }

    /// Applies a status transition.
    ///
    /// Entering Received reconciles stock: every line's item quantity is
    /// incremented inside the same transaction as the order's status write,
    /// so either all effects land or none do. The order write carries a
    /// predicate on the status we read; a concurrent transition makes it
    /// affect zero rows, which rolls the increments back and surfaces a
    /// conflict instead of a double-receive.
    #[instrument(skip(self))]
    pub async fn transition_status(
        &self,
        order_id: Uuid,
        requested_status: &str,
        actor_id: Uuid,
    ) -> Result<PurchaseOrderDetails, ServiceError> {
        let requested = parse_status(requested_status)?;
        let order = self.find_order(order_id).await?;
        let current = stored_status(&order)?;

        // Unconditional terminal guard, including requested == current.
        if current.is_terminal() {
            return Err(ServiceError::ValidationError(format!(
                "Cannot change status from {current}"
            )));
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;

        if requested == PurchaseOrderStatus::Received {
            let lines = PurchaseOrderLines::find()
                .filter(purchase_order_lines::Column::PurchaseOrderId.eq(order_id))
                .order_by_asc(purchase_order_lines::Column::LineNumber)
                .all(&txn)
                .await?;
            for line in &lines {
                let rows = InventoryService::apply_stock_increment(
                    &txn,
                    line.inventory_item_id,
                    line.quantity,
                    actor_id,
                    now,
                )
                .await?;
                if rows == 0 {
                    // Dropping the transaction rolls back any increments
                    // already applied for earlier lines.
                    return Err(ServiceError::NotFound(format!(
                        "Inventory item {} ({}) not found",
                        line.item_name, line.sku
                    )));
                }
            }
        }

        let mut update = PurchaseOrders::update_many()
            .col_expr(
                purchase_orders::Column::Status,
                Expr::value(requested.to_string()),
            )
            .col_expr(purchase_orders::Column::UpdatedBy, Expr::value(actor_id))
            .col_expr(purchase_orders::Column::UpdatedAt, Expr::value(now));

        // Set-once: a later approval never overwrites the original approver.
        if requested == PurchaseOrderStatus::Approved && order.approved_by.is_none() {
            update = update.col_expr(purchase_orders::Column::ApprovedBy, Expr::value(actor_id));
        }
        if requested == PurchaseOrderStatus::Received {
            update = update
                .col_expr(
                    purchase_orders::Column::ActualDeliveryDate,
                    Expr::value(now),
                )
                .col_expr(purchase_orders::Column::ReceivedBy, Expr::value(actor_id));
        }

        let result = update
            .filter(purchase_orders::Column::Id.eq(order_id))
            .filter(purchase_orders::Column::Status.eq(current.to_string()))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(
                "Purchase order was modified concurrently; please retry".to_string(),
            ));
        }

        txn.commit().await?;

        info!(order_id = %order_id, status = %requested, "purchase order status changed");
        self.get(order_id).await
    }

    /// Hard delete, permitted only outside terminal states.
    #[instrument(skip(self))]
    pub async fn delete(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let order = self.find_order(order_id).await?;
        let current = stored_status(&order)?;
        if current.is_terminal() {
            return Err(ServiceError::ValidationError(format!(
                "Cannot delete purchase order with status: {current}"
            )));
        }

        let txn = self.db.begin().await?;
        PurchaseOrderLines::delete_many()
            .filter(purchase_order_lines::Column::PurchaseOrderId.eq(order_id))
            .exec(&txn)
            .await?;
        PurchaseOrders::delete_by_id(order_id).exec(&txn).await?;
        txn.commit().await?;

        info!(order_id = %order_id, "purchase order deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, order_id: Uuid) -> Result<PurchaseOrderDetails, ServiceError> {
        let order = self.find_order(order_id).await?;
        let lines = PurchaseOrderLines::find()
            .filter(purchase_order_lines::Column::PurchaseOrderId.eq(order_id))
            .order_by_asc(purchase_order_lines::Column::LineNumber)
            .all(&*self.db)
            .await?;
        let supplier = suppliers::Entity::find_by_id(order.supplier_id)
            .one(&*self.db)
            .await?;
        Ok(PurchaseOrderDetails {
            order,
            supplier,
            lines,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: OrderListFilter,
    ) -> Result<(Vec<PurchaseOrderDetails>, u64), ServiceError> {
        let page = Page::new(filter.page, filter.limit);
        let order = SortOrder::parse(filter.order.as_deref(), SortOrder::Desc)?;
        let column = sort_column(filter.sort_by.as_deref())?;

        let mut query = PurchaseOrders::find();
        if let Some(status) = filter.status.as_deref() {
            let status = parse_status(status)?;
            query = query.filter(purchase_orders::Column::Status.eq(status.to_string()));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(purchase_orders::Column::SupplierId.eq(supplier_id));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(purchase_orders::Column::PoNumber.contains(search))
                    .add(purchase_orders::Column::Notes.contains(search)),
            );
        }

        let total = query.clone().count(&*self.db).await?;
        let orders = match order {
            SortOrder::Asc => query.order_by_asc(column),
            SortOrder::Desc => query.order_by_desc(column),
        }
        .limit(page.limit)
        .offset(page.offset())
        .all(&*self.db)
        .await?;

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut lines_by_order: HashMap<Uuid, Vec<purchase_order_lines::Model>> = HashMap::new();
        if !order_ids.is_empty() {
            let lines = PurchaseOrderLines::find()
                .filter(purchase_order_lines::Column::PurchaseOrderId.is_in(order_ids.clone()))
                .order_by_asc(purchase_order_lines::Column::LineNumber)
                .all(&*self.db)
                .await?;
            for line in lines {
                lines_by_order
                    .entry(line.purchase_order_id)
                    .or_default()
                    .push(line);
            }
        }

        let supplier_ids: Vec<Uuid> = orders.iter().map(|o| o.supplier_id).collect();
        let mut suppliers_by_id: HashMap<Uuid, suppliers::Model> = HashMap::new();
        if !supplier_ids.is_empty() {
            let rows = suppliers::Entity::find()
                .filter(suppliers::Column::Id.is_in(supplier_ids))
                .all(&*self.db)
                .await?;
            for supplier in rows {
                suppliers_by_id.insert(supplier.id, supplier);
            }
        }

        let details = orders
            .into_iter()
            .map(|order| {
                let lines = lines_by_order.remove(&order.id).unwrap_or_default();
                let supplier = suppliers_by_id.get(&order.supplier_id).cloned();
                PurchaseOrderDetails {
                    order,
                    supplier,
                    lines,
                }
            })
            .collect();

        Ok((details, total))
    }

    async fn find_order(&self, order_id: Uuid) -> Result<purchase_orders::Model, ServiceError> {
        PurchaseOrders::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))
    }
}

fn sort_column(raw: Option<&str>) -> Result<purchase_orders::Column, ServiceError> {
    match raw.unwrap_or("order_date") {
        "order_date" => Ok(purchase_orders::Column::OrderDate),
        "po_number" => Ok(purchase_orders::Column::PoNumber),
        "status" => Ok(purchase_orders::Column::Status),
        "total_amount" => Ok(purchase_orders::Column::TotalAmount),
        "expected_delivery_date" => Ok(purchase_orders::Column::ExpectedDeliveryDate),
        "created_at" => Ok(purchase_orders::Column::CreatedAt),
        other => Err(ServiceError::ValidationError(format!(
            "Invalid sort field '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn line(quantity: i32, unit_price: Decimal, total_price: Decimal) -> EnrichedLine {
        EnrichedLine {
            inventory_item_id: Uuid::new_v4(),
            item_name: "Widget".into(),
            sku: "WID-1".into(),
            quantity,
            unit_price,
            total_price,
        }
    }

    #[test]
    fn totals_are_recomputed_and_never_trusted() {
        // total_price seeded with garbage to prove it gets overridden
        let mut lines = vec![
            line(5, dec!(10), dec!(999)),
            line(3, dec!(20), dec!(-4)),
        ];
        let total = recompute_totals(&mut lines);
        assert_eq!(lines[0].total_price, dec!(50));
        assert_eq!(lines[1].total_price, dec!(60));
        assert_eq!(total, dec!(110));
    }

    #[test]
    fn po_number_formatting() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(month_prefix(now), "PO-202403");
        assert_eq!(format_po_number("PO-202403", 1), "PO-202403-0001");
        assert_eq!(format_po_number("PO-202403", 412), "PO-202403-0412");
    }

    #[test]
    fn po_number_sequence_parsing() {
        assert_eq!(parse_sequence("PO-202403-0007"), Some(7));
        assert_eq!(parse_sequence("PO-202403-9999"), Some(9999));
        assert_eq!(parse_sequence("PO-202403-"), None);
        assert_eq!(parse_sequence("garbage"), None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(parse_status("Draft").is_ok());
        assert!(parse_status("Cancelled").is_ok());
        assert!(matches!(
            parse_status("Shipped"),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(parse_status("received").is_err());
    }
}
