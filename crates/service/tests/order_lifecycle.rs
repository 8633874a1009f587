//! Black-box tests of the order service against the in-memory store.

use std::sync::Arc;

use atelier_catalog::LineItem;
use atelier_core::{CustomerId, OwnerId, Record};
use atelier_customers::NewCustomer;
use atelier_ledger::{PaymentMethod, PaymentStatus};
use atelier_orders::{NewOrder, OrderPatch, OrderStatus};
use atelier_service::{CustomerService, OrderService, OwnerContext, ServiceError};
use atelier_store::{ChangeKind, DocumentStore, InMemoryStore};
use atelier_workflow::ProductionStep;
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::json;

type Store = Arc<InMemoryStore>;

fn services() -> (Store, OrderService<Store>, CustomerService<Store>) {
    atelier_observability::init();
    let store = Arc::new(InMemoryStore::new());
    (
        store.clone(),
        OrderService::new(store.clone()),
        CustomerService::new(store),
    )
}

fn owner_ctx(owner: &str) -> OwnerContext {
    OwnerContext::authenticated(OwnerId::new(owner).unwrap())
}

fn shirt_and_mug() -> Vec<LineItem> {
    vec![
        LineItem::new("Camiseta", 2, 1500).unwrap(),
        LineItem::new("Taza", 1, 2000).unwrap(),
    ]
}

fn delivery() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
}

fn order_number(seq: u32) -> String {
    format!("#{:04}-{seq:04}", Utc::now().year())
}

#[tokio::test]
async fn creation_assigns_sequential_numbers_and_derivations() {
    let (_, orders, _) = services();
    let ctx = owner_ctx("workshop-1");

    let first = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    let second = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();

    assert_eq!(first.number(), order_number(1));
    assert_eq!(second.number(), order_number(2));
    assert_eq!(first.status(), OrderStatus::Pending);
    assert_eq!(first.price(), 5000);
    assert_eq!(first.product_summary(), "Camiseta (2x), Taza");
    assert!(first.workflow().is_none());
    assert_eq!(first.ledger().unwrap().status(), PaymentStatus::Pending);
}

#[tokio::test]
async fn owners_number_independently() {
    let (_, orders, _) = services();

    let first = orders
        .create_order(&owner_ctx("workshop-1"), NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    let second = orders
        .create_order(&owner_ctx("workshop-2"), NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();

    assert_eq!(first.number(), order_number(1));
    assert_eq!(second.number(), order_number(1));
}

#[tokio::test]
async fn anonymous_callers_touch_nothing() {
    let (store, orders, _) = services();

    let err = orders
        .create_order(&OwnerContext::anonymous(), NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Unauthorized));
    assert!(store.query("orders", &[], None).await.unwrap().is_empty());
    assert!(store.query("counters", &[], None).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_items_consume_no_number() {
    let (_, orders, _) = services();
    let ctx = owner_ctx("workshop-1");

    let err = orders
        .create_order(&ctx, NewOrder::new(Vec::new(), delivery()))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let order = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    assert_eq!(order.number(), order_number(1));
}

#[tokio::test]
async fn initial_payment_counts_into_customer_totals_exactly_once() {
    let (_, orders, customers) = services();
    let ctx = owner_ctx("workshop-1");
    let customer = customers
        .create_customer(&ctx, NewCustomer::new("Ana"))
        .await
        .unwrap();

    let mut new = NewOrder::new(shirt_and_mug(), delivery());
    new.customer_id = Some(*customer.id());
    new.paid_amount = 2000;
    new.payment_method = Some(PaymentMethod::Cash);
    let order = orders.create_order(&ctx, new).await.unwrap();

    let ledger = order.ledger().unwrap();
    assert_eq!(ledger.status(), PaymentStatus::Partial);
    assert_eq!(ledger.remaining_amount(), 3000);
    assert_eq!(ledger.method(), Some(PaymentMethod::Cash));

    // Spent counts the order's derived price, not the amount paid so far.
    let reloaded = customers.get_customer(&ctx, *customer.id()).await.unwrap();
    assert_eq!(reloaded.total_orders(), 1);
    assert_eq!(reloaded.total_spent(), 5000);

    // Later payment edits never re-count.
    let patch = OrderPatch {
        paid_amount: Some(5000),
        ..OrderPatch::default()
    };
    orders.update_order(&ctx, *order.id(), patch).await.unwrap();

    let after = customers.get_customer(&ctx, *customer.id()).await.unwrap();
    assert_eq!(after.total_orders(), 1);
    assert_eq!(after.total_spent(), 5000);
}

#[tokio::test]
async fn unpaid_creation_never_counts_even_when_paid_later() {
    let (_, orders, customers) = services();
    let ctx = owner_ctx("workshop-1");
    let customer = customers
        .create_customer(&ctx, NewCustomer::new("Bea"))
        .await
        .unwrap();

    let mut new = NewOrder::new(shirt_and_mug(), delivery());
    new.customer_id = Some(*customer.id());
    let order = orders.create_order(&ctx, new).await.unwrap();

    let patch = OrderPatch {
        paid_amount: Some(5000),
        ..OrderPatch::default()
    };
    let updated = orders.update_order(&ctx, *order.id(), patch).await.unwrap();
    assert_eq!(updated.ledger().unwrap().status(), PaymentStatus::Paid);

    let reloaded = customers.get_customer(&ctx, *customer.id()).await.unwrap();
    assert_eq!(reloaded.total_orders(), 0);
    assert_eq!(reloaded.total_spent(), 0);
}

#[tokio::test]
async fn exchange_orders_pin_the_ledger_and_skip_totals() {
    let (_, orders, customers) = services();
    let ctx = owner_ctx("workshop-1");
    let customer = customers
        .create_customer(&ctx, NewCustomer::new("Carla"))
        .await
        .unwrap();

    let mut new = NewOrder::new(shirt_and_mug(), delivery());
    new.customer_id = Some(*customer.id());
    new.paid_amount = 2500;
    new.is_exchange = true;
    let order = orders.create_order(&ctx, new).await.unwrap();

    let ledger = order.ledger().unwrap();
    assert_eq!(ledger.status(), PaymentStatus::Paid);
    assert_eq!(ledger.total_amount(), 0);
    assert_eq!(ledger.paid_amount(), 0);
    assert_eq!(ledger.remaining_amount(), 0);

    let reloaded = customers.get_customer(&ctx, *customer.id()).await.unwrap();
    assert_eq!(reloaded.total_orders(), 0);
}

#[tokio::test]
async fn missing_customer_surfaces_stats_failure_but_order_stands() {
    let (_, orders, _) = services();
    let ctx = owner_ctx("workshop-1");

    let mut new = NewOrder::new(shirt_and_mug(), delivery());
    new.customer_id = Some(CustomerId::new());
    new.paid_amount = 1000;
    let err = orders.create_order(&ctx, new).await.unwrap_err();

    match err {
        ServiceError::CustomerStatsFailed {
            customer_id,
            order_id,
            ..
        } => {
            let order = orders.get_order(&ctx, order_id).await.unwrap();
            assert_eq!(order.customer_id(), Some(customer_id));
            assert_eq!(order.ledger().unwrap().paid_amount(), 1000);
        }
        other => panic!("Expected CustomerStatsFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn patches_distinguish_absent_from_null() {
    let (_, orders, _) = services();
    let ctx = owner_ctx("workshop-1");

    let mut new = NewOrder::new(shirt_and_mug(), delivery());
    new.notes = Some("rush".to_string());
    let order = orders.create_order(&ctx, new).await.unwrap();

    // Absent field: untouched.
    let patch: OrderPatch = serde_json::from_value(json!({ "production_cost": 800 })).unwrap();
    let updated = orders.update_order(&ctx, *order.id(), patch).await.unwrap();
    assert_eq!(updated.notes(), Some("rush"));
    assert_eq!(updated.production_cost(), Some(800));

    // Explicit null: cleared.
    let patch: OrderPatch = serde_json::from_value(json!({ "notes": null })).unwrap();
    let updated = orders.update_order(&ctx, *order.id(), patch).await.unwrap();
    assert_eq!(updated.notes(), None);
    assert_eq!(updated.production_cost(), Some(800));
}

#[tokio::test]
async fn duplicates_reset_for_a_fresh_run() {
    let (_, orders, customers) = services();
    let ctx = owner_ctx("workshop-1");
    let customer = customers
        .create_customer(&ctx, NewCustomer::new("Dora"))
        .await
        .unwrap();

    let mut new = NewOrder::new(shirt_and_mug(), delivery());
    new.customer_id = Some(*customer.id());
    new.paid_amount = 2000;
    let order = orders.create_order(&ctx, new).await.unwrap();
    orders
        .initialize_production_workflow(&ctx, *order.id(), None)
        .await
        .unwrap();
    orders
        .set_step_completion(&ctx, *order.id(), ProductionStep::Design, true, None)
        .await
        .unwrap();

    let copy = orders.duplicate_order(&ctx, *order.id()).await.unwrap();

    assert_ne!(copy.id(), order.id());
    assert_eq!(copy.number(), order_number(2));
    assert_eq!(copy.status(), OrderStatus::Pending);
    assert_eq!(copy.ledger().unwrap().paid_amount(), 0);
    assert_eq!(copy.ledger().unwrap().status(), PaymentStatus::Pending);
    assert!(copy.workflow().is_none());
    assert!(copy.attachments().is_none());
    assert!(copy.deleted_at().is_none());
    assert_eq!(copy.items(), order.items());
    assert_eq!(copy.product_summary(), order.product_summary());
    assert_eq!(copy.customer_id(), Some(*customer.id()));
    assert_eq!(copy.source_quote_id(), None);

    // A zero-paid copy never re-counts into customer totals.
    let reloaded = customers.get_customer(&ctx, *customer.id()).await.unwrap();
    assert_eq!(reloaded.total_orders(), 1);
}

#[tokio::test]
async fn soft_delete_hides_the_record_and_keeps_the_sequence() {
    let (store, orders, _) = services();
    let ctx = owner_ctx("workshop-1");

    let order = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    orders.delete_order(&ctx, *order.id()).await.unwrap();

    assert!(orders.list_orders(&ctx).await.unwrap().is_empty());
    match orders.get_order(&ctx, *order.id()).await.unwrap_err() {
        ServiceError::NotFound(label) => assert_eq!(label, "order"),
        other => panic!("Expected NotFound, got {other:?}"),
    }

    // Still in storage, tombstoned.
    let doc = store
        .get("orders", &order.id().to_string())
        .await
        .unwrap()
        .unwrap();
    assert!(!doc["deleted_at"].is_null());

    // The number is never reissued.
    let next = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    assert_eq!(next.number(), order_number(2));
}

#[tokio::test]
async fn cross_owner_access_is_unauthorized() {
    let (_, orders, _) = services();
    let owner = owner_ctx("workshop-1");
    let intruder = owner_ctx("workshop-2");

    let order = orders
        .create_order(&owner, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();

    let err = orders.get_order(&intruder, *order.id()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
    assert!(orders.list_orders(&intruder).await.unwrap().is_empty());

    let err = orders.delete_order(&intruder, *order.id()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
}

#[tokio::test]
async fn listing_returns_newest_first() {
    let (_, orders, _) = services();
    let ctx = owner_ctx("workshop-1");

    let first = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    let second = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();

    let listed = orders.list_orders(&ctx).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].created_at() >= listed[1].created_at());
    let numbers: Vec<&str> = listed.iter().map(|o| o.number()).collect();
    assert!(numbers.contains(&first.number()));
    assert!(numbers.contains(&second.number()));
}

#[tokio::test]
async fn workflow_lifecycle_drives_order_status() {
    let (_, orders, _) = services();
    let ctx = owner_ctx("workshop-1");
    let order = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    let id = *order.id();

    let order = orders
        .initialize_production_workflow(&ctx, id, Some(delivery()))
        .await
        .unwrap();
    let workflow = order.workflow().unwrap();
    assert_eq!(workflow.current_step(), ProductionStep::Design);
    assert!(workflow.started_at().is_some());
    assert_eq!(workflow.estimated_completion_date(), Some(delivery()));

    // Double attachment is rejected.
    let err = orders
        .initialize_production_workflow(&ctx, id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let order = orders
        .set_step_completion(&ctx, id, ProductionStep::Design, true, Some("files ready".to_string()))
        .await
        .unwrap();
    assert_eq!(order.status(), OrderStatus::InProgress);
    assert_eq!(order.workflow().unwrap().current_step(), ProductionStep::Approval);

    for step in ProductionStep::PIPELINE {
        orders.set_step_completion(&ctx, id, step, true, None).await.unwrap();
    }

    // Derived completion survives a round trip through storage.
    let done = orders.get_order(&ctx, id).await.unwrap();
    assert_eq!(done.status(), OrderStatus::Completed);
    assert!(done.workflow().unwrap().is_complete());
    assert_eq!(done.workflow().unwrap().current_step(), ProductionStep::Packaging);

    // Un-checking a step never regresses the order status.
    let order = orders
        .set_step_completion(&ctx, id, ProductionStep::Cutting, false, None)
        .await
        .unwrap();
    assert_eq!(order.status(), OrderStatus::Completed);
    assert_eq!(order.workflow().unwrap().current_step(), ProductionStep::Cutting);
}

#[tokio::test]
async fn cancelled_orders_refuse_production_and_status_changes() {
    let (_, orders, _) = services();
    let ctx = owner_ctx("workshop-1");
    let order = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    let id = *order.id();

    let patch = OrderPatch {
        status: Some(OrderStatus::Cancelled),
        ..OrderPatch::default()
    };
    orders.update_order(&ctx, id, patch).await.unwrap();

    let patch = OrderPatch {
        status: Some(OrderStatus::Pending),
        ..OrderPatch::default()
    };
    let err = orders.update_order(&ctx, id, patch).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let err = orders
        .initialize_production_workflow(&ctx, id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Invariant(_)));

    // Soft delete is independent of the status machine.
    orders.delete_order(&ctx, id).await.unwrap();
}

#[tokio::test]
async fn payments_accumulate_until_paid() {
    let (_, orders, _) = services();
    let ctx = owner_ctx("workshop-1");
    let order = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    let id = *order.id();

    let order = orders
        .add_order_payment(&ctx, id, 2000, Some(PaymentMethod::Cash))
        .await
        .unwrap();
    assert_eq!(order.ledger().unwrap().status(), PaymentStatus::Partial);

    let order = orders
        .add_order_payment(&ctx, id, 3000, Some(PaymentMethod::Card))
        .await
        .unwrap();
    let ledger = order.ledger().unwrap();
    assert_eq!(ledger.status(), PaymentStatus::Paid);
    assert_eq!(ledger.remaining_amount(), 0);
    assert_eq!(ledger.payments().unwrap().len(), 2);
    assert_eq!(ledger.method(), Some(PaymentMethod::Card));
}

#[tokio::test]
async fn stored_documents_keep_explicit_nulls() {
    let (store, orders, _) = services();
    let ctx = owner_ctx("workshop-1");
    let order = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();

    let doc = store
        .get("orders", &order.id().to_string())
        .await
        .unwrap()
        .unwrap();
    let obj = doc.as_object().unwrap();

    for field in ["customer_id", "notes", "workflow", "deleted_at", "source_quote_id"] {
        assert!(obj.contains_key(field), "{field} must be persisted");
        assert!(obj[field].is_null(), "{field} must be an explicit null");
    }
}

#[tokio::test]
async fn watch_streams_order_changes() {
    let (store, orders, _) = services();
    let ctx = owner_ctx("workshop-1");
    let sub = store.watch("orders");

    let order = orders
        .create_order(&ctx, NewOrder::new(shirt_and_mug(), delivery()))
        .await
        .unwrap();
    let patch = OrderPatch {
        status: Some(OrderStatus::InProgress),
        ..OrderPatch::default()
    };
    orders.update_order(&ctx, *order.id(), patch).await.unwrap();

    let created = sub.try_recv().unwrap();
    assert_eq!(created.kind, ChangeKind::Created);
    assert_eq!(created.id, order.id().to_string());
    assert_eq!(created.doc["status"], json!("pending"));

    let updated = sub.try_recv().unwrap();
    assert_eq!(updated.kind, ChangeKind::Updated);
    assert_eq!(updated.doc["status"], json!("in-progress"));
}
