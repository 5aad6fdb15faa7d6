mod common;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, Duration, Utc};
use common::{money, TestApp};
use sea_orm::EntityTrait;
use serde_json::{json, Value};
use uuid::Uuid;

use stockroom_api::entities::inventory_items;

fn delivery_date() -> String {
    (Utc::now() + Duration::days(14)).to_rfc3339()
}

async fn item_quantity(app: &TestApp, item_id: Uuid) -> i32 {
    inventory_items::Entity::find_by_id(item_id)
        .one(&*app.state.db)
        .await
        .expect("query item")
        .expect("item exists")
        .quantity
}

async fn create_order(app: &TestApp, token: &str, supplier: Uuid, items: Value) -> Value {
    let (status, body) = app
        .request(
            Method::POST,
            "/api/purchase-orders",
            Some(token),
            Some(json!({
                "supplier_id": supplier,
                "items": items,
                "expected_delivery_date": delivery_date(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create order failed: {body}");
    body["data"].clone()
}

async fn set_status(app: &TestApp, token: &str, order_id: &str, status: &str) -> (StatusCode, Value) {
    app.request(
        Method::PATCH,
        &format!("/api/purchase-orders/{order_id}/status"),
        Some(token),
        Some(json!({ "status": status })),
    )
    .await
}

#[tokio::test]
async fn receiving_increments_stock_and_stamps_the_order() {
    let app = TestApp::new().await;
    let (token, manager_id) = app.register_user("Mara", "mara@example.com", "Manager").await;
    let supplier = app.create_supplier(&token, "Acme Supplies").await;
    let widget = app.create_item(&token, "Widget", "WID-1", 100, 10.0, 10).await;
    let gadget = app.create_item(&token, "Gadget", "GAD-1", 40, 20.0, 10).await;

    let order = create_order(
        &app,
        &token,
        supplier,
        json!([
            { "inventory_item_id": widget, "quantity": 5 },
            { "inventory_item_id": gadget, "quantity": 3 },
        ]),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();
    assert_eq!(order["status"], "Draft");
    assert_eq!(money(&order["total_amount"]), 110.0);

    // Walk the happy path.
    let (status, body) = set_status(&app, &token, order_id, "Pending").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, body) = set_status(&app, &token, order_id, "Approved").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["data"]["approved_by"].as_str().unwrap(),
        manager_id.to_string()
    );

    let (status, body) = set_status(&app, &token, order_id, "Received").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["message"],
        "Purchase order marked as received and inventory updated successfully"
    );
    assert_eq!(body["data"]["status"], "Received");
    assert_eq!(
        body["data"]["received_by"].as_str().unwrap(),
        manager_id.to_string()
    );
    assert!(body["data"]["actual_delivery_date"].is_string());

    assert_eq!(item_quantity(&app, widget).await, 105);
    assert_eq!(item_quantity(&app, gadget).await, 43);
}

#[tokio::test]
async fn missing_item_aborts_the_whole_receipt() {
    let app = TestApp::new().await;
    let (token, _) = app.register_user("Mara", "mara@example.com", "Manager").await;
    let supplier = app.create_supplier(&token, "Acme Supplies").await;
    let first = app.create_item(&token, "First", "FIRST-1", 100, 10.0, 10).await;
    let second = app.create_item(&token, "Second", "SECOND-1", 40, 20.0, 10).await;

    let order = create_order(
        &app,
        &token,
        supplier,
        json!([
            { "inventory_item_id": first, "quantity": 5 },
            { "inventory_item_id": second, "quantity": 3 },
        ]),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    // Simulate the second item's row vanishing from under the order.
    inventory_items::Entity::delete_by_id(second)
        .exec(&*app.state.db)
        .await
        .expect("delete item row");

    let (status, body) = set_status(&app, &token, order_id, "Received").await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Second (SECOND-1)"));

    // Nothing may survive the rollback: first item untouched, order still Draft.
    assert_eq!(item_quantity(&app, first).await, 100);
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/purchase-orders/{order_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Draft");
    assert!(body["data"]["actual_delivery_date"].is_null());
    assert!(body["data"]["received_by"].is_null());
}

#[tokio::test]
async fn terminal_orders_reject_every_transition_update_and_delete() {
    let app = TestApp::new().await;
    let (admin_token, _) = app.register_user("Ada", "ada@example.com", "Admin").await;
    let supplier = app.create_supplier(&admin_token, "Acme Supplies").await;
    let item = app.create_item(&admin_token, "Widget", "WID-1", 0, 5.0, 10).await;

    // Received order
    let received = create_order(
        &app,
        &admin_token,
        supplier,
        json!([{ "inventory_item_id": item, "quantity": 2 }]),
    )
    .await;
    let received_id = received["id"].as_str().unwrap().to_string();
    let (status, _) = set_status(&app, &admin_token, &received_id, "Received").await;
    assert_eq!(status, StatusCode::OK);

    // Cancelled order
    let cancelled = create_order(
        &app,
        &admin_token,
        supplier,
        json!([{ "inventory_item_id": item, "quantity": 2 }]),
    )
    .await;
    let cancelled_id = cancelled["id"].as_str().unwrap().to_string();
    let (status, _) = set_status(&app, &admin_token, &cancelled_id, "Cancelled").await;
    assert_eq!(status, StatusCode::OK);

    for order_id in [&received_id, &cancelled_id] {
        // Every target status fails, including the current one.
        for target in ["Draft", "Pending", "Approved", "Received", "Cancelled"] {
            let (status, body) = set_status(&app, &admin_token, order_id, target).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{target}: {body}");
            assert!(body["message"]
                .as_str()
                .unwrap()
                .contains("Cannot change status from"));
        }

        let (status, body) = app
            .request(
                Method::PUT,
                &format!("/api/purchase-orders/{order_id}"),
                Some(&admin_token),
                Some(json!({ "notes": "late edit" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

        let (status, body) = app
            .request(
                Method::DELETE,
                &format!("/api/purchase-orders/{order_id}"),
                Some(&admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    // The cancelled order's stock was never incremented.
    assert_eq!(item_quantity(&app, item).await, 2);
}

#[tokio::test]
async fn unknown_status_is_a_validation_error() {
    let app = TestApp::new().await;
    let (token, _) = app.register_user("Mara", "mara@example.com", "Manager").await;
    let supplier = app.create_supplier(&token, "Acme Supplies").await;
    let item = app.create_item(&token, "Widget", "WID-1", 0, 5.0, 10).await;
    let order = create_order(
        &app,
        &token,
        supplier,
        json!([{ "inventory_item_id": item, "quantity": 1 }]),
    )
    .await;

    let (status, body) =
        set_status(&app, &token, order["id"].as_str().unwrap(), "Shipped").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["message"].as_str().unwrap().contains("Invalid status"));
}

#[tokio::test]
async fn line_prices_snapshot_and_totals_are_recomputed() {
    let app = TestApp::new().await;
    let (token, _) = app.register_user("Mara", "mara@example.com", "Manager").await;
    let supplier = app.create_supplier(&token, "Acme Supplies").await;
    let item = app.create_item(&token, "Widget", "WID-1", 0, 12.5, 10).await;

    // unit_price omitted: defaults to the item's current price.
    let order = create_order(
        &app,
        &token,
        supplier,
        json!([{ "inventory_item_id": item, "quantity": 4 }]),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();
    assert_eq!(money(&order["items"][0]["unit_price"]), 12.5);
    assert_eq!(money(&order["items"][0]["total_price"]), 50.0);
    assert_eq!(money(&order["total_amount"]), 50.0);
    assert_eq!(order["items"][0]["item_name"], "Widget");
    assert_eq!(order["items"][0]["sku"], "WID-1");

    // Raising the item's price later must not rewrite the stored line.
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/inventory/{item}"),
            Some(&token),
            Some(json!({ "unit_price": 99.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/purchase-orders/{order_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["data"]["items"][0]["unit_price"]), 12.5);
    assert_eq!(money(&body["data"]["total_amount"]), 50.0);

    // Replacing the line set re-derives totals from the new lines.
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/purchase-orders/{order_id}"),
            Some(&token),
            Some(json!({
                "items": [{ "inventory_item_id": item, "quantity": 2, "unit_price": 7.0 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(money(&body["data"]["total_amount"]), 14.0);
}

#[tokio::test]
async fn po_numbers_are_month_scoped_and_sequential() {
    let app = TestApp::new().await;
    let (token, _) = app.register_user("Mara", "mara@example.com", "Manager").await;
    let supplier = app.create_supplier(&token, "Acme Supplies").await;
    let item = app.create_item(&token, "Widget", "WID-1", 0, 5.0, 10).await;

    let now = Utc::now();
    let prefix = format!("PO-{}{:02}", now.year(), now.month());

    let first = create_order(
        &app,
        &token,
        supplier,
        json!([{ "inventory_item_id": item, "quantity": 1 }]),
    )
    .await;
    let second = create_order(
        &app,
        &token,
        supplier,
        json!([{ "inventory_item_id": item, "quantity": 1 }]),
    )
    .await;

    assert_eq!(
        first["po_number"].as_str().unwrap(),
        format!("{prefix}-0001")
    );
    assert_eq!(
        second["po_number"].as_str().unwrap(),
        format!("{prefix}-0002")
    );
}

#[tokio::test]
async fn concurrent_creations_never_share_a_po_number() {
    let app = TestApp::new().await;
    let (token, manager_id) = app.register_user("Mara", "mara@example.com", "Manager").await;
    let supplier = app.create_supplier(&token, "Acme Supplies").await;
    let item = app.create_item(&token, "Widget", "WID-1", 0, 5.0, 10).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = app.state.services.purchase_orders.clone();
        tasks.push(tokio::spawn(async move {
            service
                .create(
                    stockroom_api::services::purchase_orders::CreatePurchaseOrderInput {
                        supplier_id: supplier,
                        items: vec![
                            stockroom_api::services::purchase_orders::OrderLineInput {
                                inventory_item_id: item,
                                quantity: 1,
                                unit_price: None,
                            },
                        ],
                        expected_delivery_date: Utc::now() + Duration::days(7),
                        notes: None,
                    },
                    manager_id,
                )
                .await
        }));
    }

    let mut numbers = Vec::new();
    for task in tasks {
        match task.await.expect("task join") {
            Ok(details) => numbers.push(details.order.po_number),
            // A numbering collision must surface as a conflict, never as a
            // silently duplicated order.
            Err(err) => assert!(matches!(
                err,
                stockroom_api::errors::ServiceError::Conflict(_)
            )),
        }
    }

    let mut deduped = numbers.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), numbers.len(), "duplicate PO numbers issued");
}

#[tokio::test]
async fn create_rejects_missing_references_and_past_dates() {
    let app = TestApp::new().await;
    let (token, _) = app.register_user("Mara", "mara@example.com", "Manager").await;
    let supplier = app.create_supplier(&token, "Acme Supplies").await;
    let item = app.create_item(&token, "Widget", "WID-1", 0, 5.0, 10).await;

    // Unknown supplier
    let (status, body) = app
        .request(
            Method::POST,
            "/api/purchase-orders",
            Some(&token),
            Some(json!({
                "supplier_id": Uuid::new_v4(),
                "items": [{ "inventory_item_id": item, "quantity": 1 }],
                "expected_delivery_date": delivery_date(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    // Unknown inventory item, named in the error
    let ghost = Uuid::new_v4();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/purchase-orders",
            Some(&token),
            Some(json!({
                "supplier_id": supplier,
                "items": [{ "inventory_item_id": ghost, "quantity": 1 }],
                "expected_delivery_date": delivery_date(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert!(body["message"].as_str().unwrap().contains(&ghost.to_string()));

    // Past delivery date
    let (status, body) = app
        .request(
            Method::POST,
            "/api/purchase-orders",
            Some(&token),
            Some(json!({
                "supplier_id": supplier,
                "items": [{ "inventory_item_id": item, "quantity": 1 }],
                "expected_delivery_date": (Utc::now() - Duration::days(1)).to_rfc3339(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    // Empty line set
    let (status, body) = app
        .request(
            Method::POST,
            "/api/purchase-orders",
            Some(&token),
            Some(json!({
                "supplier_id": supplier,
                "items": [],
                "expected_delivery_date": delivery_date(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn deleting_a_draft_order_removes_it_and_its_lines() {
    let app = TestApp::new().await;
    let (token, _) = app.register_user("Ada", "ada@example.com", "Admin").await;
    let supplier = app.create_supplier(&token, "Acme Supplies").await;
    let item = app.create_item(&token, "Widget", "WID-1", 0, 5.0, 10).await;
    let order = create_order(
        &app,
        &token,
        supplier,
        json!([{ "inventory_item_id": item, "quantity": 1 }]),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/api/purchase-orders/{order_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/purchase-orders/{order_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
