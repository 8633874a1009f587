//! Black-box tests of the quote service, including the approval handoff
//! into orders and its partial-failure recovery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use atelier_catalog::{Discount, LineItem};
use atelier_core::{OwnerId, Record};
use atelier_customers::NewCustomer;
use atelier_ledger::PaymentStatus;
use atelier_orders::OrderStatus;
use atelier_quotes::{NewQuote, QuotePatch, QuoteStatus};
use atelier_service::{CustomerService, OrderService, OwnerContext, QuoteService, ServiceError};
use atelier_store::{
    ChangeNotification, DocumentStore, InMemoryStore, OrderBy, StoreError, Subscription,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::Value as JsonValue;

fn fresh_store() -> Arc<InMemoryStore> {
    atelier_observability::init();
    Arc::new(InMemoryStore::new())
}

fn owner_ctx(owner: &str) -> OwnerContext {
    OwnerContext::authenticated(OwnerId::new(owner).unwrap())
}

fn shirts(quantity: u32, unit_price: u64) -> Vec<LineItem> {
    vec![LineItem::new("Camiseta", quantity, unit_price).unwrap()]
}

fn delivery() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
}

fn order_number(seq: u32) -> String {
    format!("#{:04}-{seq:04}", Utc::now().year())
}

#[tokio::test]
async fn quotes_use_their_own_number_sequence() {
    let store = fresh_store();
    let quotes = QuoteService::new(store.clone());
    let orders = OrderService::new(store);
    let ctx = owner_ctx("workshop-1");

    let first = quotes.create_quote(&ctx, NewQuote::new(shirts(1, 2000))).await.unwrap();
    let second = quotes.create_quote(&ctx, NewQuote::new(shirts(1, 2000))).await.unwrap();
    assert_eq!(first.number(), "ORC-0001");
    assert_eq!(second.number(), "ORC-0002");
    assert_eq!(first.status(), QuoteStatus::Draft);

    // Order numbering is untouched by quote allocations.
    let order = orders
        .create_order(
            &ctx,
            atelier_orders::NewOrder::new(shirts(1, 2000), delivery()),
        )
        .await
        .unwrap();
    assert_eq!(order.number(), order_number(1));
}

#[tokio::test]
async fn approval_builds_the_order_from_the_quote() {
    let store = fresh_store();
    let quotes = QuoteService::new(store.clone());
    let customers = CustomerService::new(store);
    let ctx = owner_ctx("workshop-1");
    let customer = customers
        .create_customer(&ctx, NewCustomer::new("Ana"))
        .await
        .unwrap();

    let mut new = NewQuote::new(shirts(2, 2500));
    new.discount = Some(Discount::percentage(10).unwrap());
    new.delivery_date = Some(delivery());
    new.customer_id = Some(*customer.id());
    let quote = quotes.create_quote(&ctx, new).await.unwrap();
    assert_eq!(quote.total(), 4500);

    let (order, approved) = quotes.approve_quote(&ctx, *quote.id()).await.unwrap();

    // The order carries the discounted total, not the plain items sum.
    assert_eq!(order.number(), order_number(1));
    assert_eq!(order.price(), 4500);
    assert_eq!(order.items(), quote.items());
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.customer_id(), Some(*customer.id()));
    assert_eq!(order.source_quote_id(), Some(*quote.id()));
    assert!(order.notes().unwrap().contains("ORC-0001"));
    let ledger = order.ledger().unwrap();
    assert_eq!(ledger.total_amount(), 4500);
    assert_eq!(ledger.status(), PaymentStatus::Pending);

    assert_eq!(approved.status(), QuoteStatus::Approved);
    assert_eq!(approved.linked_order_id(), Some(*order.id()));
    assert_eq!(approved.linked_order_number(), Some(order.number()));
}

#[tokio::test]
async fn approval_requires_a_delivery_date() {
    let store = fresh_store();
    let quotes = QuoteService::new(store);
    let ctx = owner_ctx("workshop-1");

    let quote = quotes.create_quote(&ctx, NewQuote::new(shirts(1, 2000))).await.unwrap();
    let err = quotes.approve_quote(&ctx, *quote.id()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let reloaded = quotes.get_quote(&ctx, *quote.id()).await.unwrap();
    assert_eq!(reloaded.status(), QuoteStatus::Draft);
}

#[tokio::test]
async fn approving_twice_conflicts_and_keeps_the_first_link() {
    let store = fresh_store();
    let quotes = QuoteService::new(store.clone());
    let orders = OrderService::new(store);
    let ctx = owner_ctx("workshop-1");

    let mut new = NewQuote::new(shirts(1, 2000));
    new.delivery_date = Some(delivery());
    let quote = quotes.create_quote(&ctx, new).await.unwrap();

    let (order, _) = quotes.approve_quote(&ctx, *quote.id()).await.unwrap();
    let err = quotes.approve_quote(&ctx, *quote.id()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let reloaded = quotes.get_quote(&ctx, *quote.id()).await.unwrap();
    assert_eq!(reloaded.linked_order_id(), Some(*order.id()));
    assert_eq!(orders.list_orders(&ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn approved_quotes_reject_every_patch() {
    let store = fresh_store();
    let quotes = QuoteService::new(store);
    let ctx = owner_ctx("workshop-1");

    let mut new = NewQuote::new(shirts(1, 2000));
    new.delivery_date = Some(delivery());
    let quote = quotes.create_quote(&ctx, new).await.unwrap();
    quotes.approve_quote(&ctx, *quote.id()).await.unwrap();

    let patch = QuotePatch {
        items: Some(shirts(3, 1000)),
        ..QuotePatch::default()
    };
    let err = quotes.update_quote(&ctx, *quote.id(), patch).await.unwrap_err();
    assert!(matches!(err, ServiceError::Invariant(_)));
}

#[tokio::test]
async fn direct_status_patch_to_approved_is_rejected() {
    let store = fresh_store();
    let quotes = QuoteService::new(store);
    let ctx = owner_ctx("workshop-1");
    let quote = quotes.create_quote(&ctx, NewQuote::new(shirts(1, 2000))).await.unwrap();

    let patch = QuotePatch {
        status: Some(QuoteStatus::Approved),
        ..QuotePatch::default()
    };
    let err = quotes.update_quote(&ctx, *quote.id(), patch).await.unwrap_err();
    assert!(matches!(err, ServiceError::Invariant(_)));

    // The free-form part of the machine still moves.
    let patch = QuotePatch {
        status: Some(QuoteStatus::Sent),
        ..QuotePatch::default()
    };
    let updated = quotes.update_quote(&ctx, *quote.id(), patch).await.unwrap();
    assert_eq!(updated.status(), QuoteStatus::Sent);
}

#[tokio::test]
async fn updates_recompute_the_discounted_total() {
    let store = fresh_store();
    let quotes = QuoteService::new(store);
    let ctx = owner_ctx("workshop-1");

    let mut new = NewQuote::new(shirts(2, 2500));
    new.discount = Some(Discount::percentage(10).unwrap());
    let quote = quotes.create_quote(&ctx, new).await.unwrap();
    assert_eq!(quote.total(), 4500);

    // Dropping the discount through an explicit null restores the items sum.
    let patch: QuotePatch = serde_json::from_value(serde_json::json!({ "discount": null })).unwrap();
    let updated = quotes.update_quote(&ctx, *quote.id(), patch).await.unwrap();
    assert_eq!(updated.total(), 5000);

    let patch = QuotePatch {
        items: Some(shirts(1, 2000)),
        ..QuotePatch::default()
    };
    let updated = quotes.update_quote(&ctx, *quote.id(), patch).await.unwrap();
    assert_eq!(updated.total(), 2000);
}

#[tokio::test]
async fn soft_deleted_quotes_cannot_be_approved() {
    let store = fresh_store();
    let quotes = QuoteService::new(store);
    let ctx = owner_ctx("workshop-1");

    let mut new = NewQuote::new(shirts(1, 2000));
    new.delivery_date = Some(delivery());
    let quote = quotes.create_quote(&ctx, new).await.unwrap();
    quotes.delete_quote(&ctx, *quote.id()).await.unwrap();

    assert!(quotes.list_quotes(&ctx).await.unwrap().is_empty());
    let err = quotes.approve_quote(&ctx, *quote.id()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("quote")));
}

/// Store wrapper that fails the next `patch` once, then behaves normally.
#[derive(Clone)]
struct FlakyPatchStore {
    inner: Arc<InMemoryStore>,
    fail_next_patch: Arc<AtomicBool>,
}

impl FlakyPatchStore {
    fn new() -> Self {
        Self {
            inner: fresh_store(),
            fail_next_patch: Arc::new(AtomicBool::new(false)),
        }
    }

    fn fail_next_patch(&self) {
        self.fail_next_patch.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DocumentStore for FlakyPatchStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<JsonValue>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn put(&self, collection: &str, id: &str, doc: JsonValue) -> Result<(), StoreError> {
        self.inner.put(collection, id, doc).await
    }

    async fn patch(&self, collection: &str, id: &str, fields: JsonValue) -> Result<(), StoreError> {
        if self.fail_next_patch.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected patch failure".to_string()));
        }
        self.inner.patch(collection, id, fields).await
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, JsonValue)],
        order_by: Option<OrderBy>,
    ) -> Result<Vec<JsonValue>, StoreError> {
        self.inner.query(collection, filters, order_by).await
    }

    async fn transact<F>(
        &self,
        collection: &str,
        id: &str,
        update: F,
    ) -> Result<JsonValue, StoreError>
    where
        F: FnMut(Option<JsonValue>) -> Result<JsonValue, StoreError> + Send,
    {
        self.inner.transact(collection, id, update).await
    }

    fn watch(&self, collection: &str) -> Subscription<ChangeNotification> {
        self.inner.watch(collection)
    }
}

#[tokio::test]
async fn interrupted_approval_resumes_without_a_second_order() {
    let store = FlakyPatchStore::new();
    let quotes = QuoteService::new(store.clone());
    let orders = OrderService::new(store.clone());
    let ctx = owner_ctx("workshop-1");

    let mut new = NewQuote::new(shirts(1, 2000));
    new.delivery_date = Some(delivery());
    let quote = quotes.create_quote(&ctx, new).await.unwrap();

    store.fail_next_patch();
    let err = quotes.approve_quote(&ctx, *quote.id()).await.unwrap_err();
    let failed_order_id = match err {
        ServiceError::QuoteApprovalIncomplete {
            quote_id,
            order_id,
            ..
        } => {
            assert_eq!(quote_id, *quote.id());
            order_id
        }
        other => panic!("Expected QuoteApprovalIncomplete, got {other:?}"),
    };

    // The order exists, the quote is still unapproved.
    assert_eq!(orders.list_orders(&ctx).await.unwrap().len(), 1);
    let pending = quotes.get_quote(&ctx, *quote.id()).await.unwrap();
    assert_eq!(pending.status(), QuoteStatus::Draft);
    assert_eq!(pending.linked_order_id(), None);

    // Retry resumes with the already-created order; no duplicate, no fresh
    // number burned.
    let (order, approved) = quotes.approve_quote(&ctx, *quote.id()).await.unwrap();
    assert_eq!(*order.id(), failed_order_id);
    assert_eq!(approved.status(), QuoteStatus::Approved);
    assert_eq!(approved.linked_order_id(), Some(failed_order_id));
    assert_eq!(orders.list_orders(&ctx).await.unwrap().len(), 1);

    let next = orders
        .create_order(
            &ctx,
            atelier_orders::NewOrder::new(shirts(1, 2000), delivery()),
        )
        .await
        .unwrap();
    assert_eq!(next.number(), order_number(2));
}
