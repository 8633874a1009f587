//! Order operations.

use atelier_catalog::validate_items;
use atelier_core::{CustomerId, OrderId, OwnerId, Record};
use atelier_customers::Customer;
use atelier_ledger::{PaymentEntry, PaymentMethod};
use atelier_numbering::SequenceKind;
use atelier_orders::{NewOrder, Order, OrderPatch};
use atelier_store::DocumentStore;
use atelier_workflow::ProductionStep;
use chrono::{Datelike, NaiveDate, Utc};
use tracing::{info, warn};

use crate::allocator::SequenceAllocator;
use crate::context::OwnerContext;
use crate::documents::{list_active, load_active, to_doc};
use crate::error::{ServiceError, ServiceResult};

/// Order lifecycle operations over one storage backend.
#[derive(Debug, Clone)]
pub struct OrderService<S> {
    store: S,
    allocator: SequenceAllocator<S>,
}

impl<S: DocumentStore + Clone> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            allocator: SequenceAllocator::new(store.clone()),
            store,
        }
    }

    /// Create an order under a freshly allocated number.
    ///
    /// If allocation fails, nothing is written. A nonzero initial payment on
    /// an order linked to a customer also bumps that customer's running
    /// totals; when that second write fails the order stands and the error
    /// names the customer ([`ServiceError::CustomerStatsFailed`]).
    pub async fn create_order(&self, ctx: &OwnerContext, new: NewOrder) -> ServiceResult<Order> {
        let owner = ctx.require_owner()?.clone();
        let now = Utc::now();

        // Validate before allocating so bad input does not consume a number.
        validate_items(&new.items)?;

        let number = self
            .allocator
            .allocate(&owner, SequenceKind::Orders, now.year())
            .await?;
        let order = Order::create(OrderId::new(), owner.clone(), number, new, now)?;
        self.store
            .put(Order::COLLECTION, &order.id().to_string(), to_doc(&order)?)
            .await?;
        info!(owner = %owner, number = order.number(), "order created");

        // First-payment rule: an order created with money already down
        // counts into the customer's totals here and never on later edits.
        // Exchange orders carry a zero-paid ledger and stay out.
        let initial_paid = order.ledger().map(|ledger| ledger.paid_amount()).unwrap_or(0);
        if initial_paid > 0 {
            if let Some(customer_id) = order.customer_id() {
                self.apply_customer_stats(&owner, customer_id, &order).await?;
            }
        }

        Ok(order)
    }

    pub async fn get_order(&self, ctx: &OwnerContext, id: OrderId) -> ServiceResult<Order> {
        let owner = ctx.require_owner()?;
        load_active(&self.store, owner, &id, "order").await
    }

    /// Live orders for the caller, newest first.
    pub async fn list_orders(&self, ctx: &OwnerContext) -> ServiceResult<Vec<Order>> {
        let owner = ctx.require_owner()?;
        list_active(&self.store, owner).await
    }

    /// Apply a partial update and persist the whole record.
    pub async fn update_order(
        &self,
        ctx: &OwnerContext,
        id: OrderId,
        patch: OrderPatch,
    ) -> ServiceResult<Order> {
        let owner = ctx.require_owner()?;
        let now = Utc::now();
        let mut order: Order = load_active(&self.store, owner, &id, "order").await?;
        order.apply_patch(patch, now)?;
        self.store
            .put(Order::COLLECTION, &id.to_string(), to_doc(&order)?)
            .await?;
        Ok(order)
    }

    /// Copy an order under a new identity and number, reset for a fresh run.
    pub async fn duplicate_order(&self, ctx: &OwnerContext, id: OrderId) -> ServiceResult<Order> {
        let owner = ctx.require_owner()?;
        let now = Utc::now();
        let source: Order = load_active(&self.store, owner, &id, "order").await?;
        let number = self
            .allocator
            .allocate(owner, SequenceKind::Orders, now.year())
            .await?;
        let copy = source.duplicate_as(OrderId::new(), number, now);
        self.store
            .put(Order::COLLECTION, &copy.id().to_string(), to_doc(&copy)?)
            .await?;
        info!(owner = %owner, source = source.number(), number = copy.number(), "order duplicated");
        Ok(copy)
    }

    /// Soft delete. The record keeps its number and stays in storage but
    /// disappears from reads; the number is never reissued.
    pub async fn delete_order(&self, ctx: &OwnerContext, id: OrderId) -> ServiceResult<()> {
        let owner = ctx.require_owner()?;
        let now = Utc::now();
        let order: Order = load_active(&self.store, owner, &id, "order").await?;
        self.store
            .patch(
                Order::COLLECTION,
                &id.to_string(),
                serde_json::json!({ "deleted_at": now, "updated_at": now }),
            )
            .await?;
        info!(owner = %owner, number = order.number(), "order deleted");
        Ok(())
    }

    /// Attach the production workflow to an order. Production starts
    /// explicitly, not at order creation.
    pub async fn initialize_production_workflow(
        &self,
        ctx: &OwnerContext,
        id: OrderId,
        estimated_completion_date: Option<NaiveDate>,
    ) -> ServiceResult<Order> {
        let owner = ctx.require_owner()?;
        let now = Utc::now();
        let mut order: Order = load_active(&self.store, owner, &id, "order").await?;
        order.attach_workflow(estimated_completion_date, now)?;
        self.store
            .put(Order::COLLECTION, &id.to_string(), to_doc(&order)?)
            .await?;
        info!(owner = %owner, number = order.number(), "production workflow started");
        Ok(order)
    }

    /// Toggle a production step. The workflow and the derived order status
    /// land in one document write.
    pub async fn set_step_completion(
        &self,
        ctx: &OwnerContext,
        id: OrderId,
        step: ProductionStep,
        completed: bool,
        notes: Option<String>,
    ) -> ServiceResult<Order> {
        let owner = ctx.require_owner()?;
        let now = Utc::now();
        let mut order: Order = load_active(&self.store, owner, &id, "order").await?;
        order.set_step_completion(step, completed, owner, notes, now)?;
        self.store
            .put(Order::COLLECTION, &id.to_string(), to_doc(&order)?)
            .await?;
        Ok(order)
    }

    /// Record one payment against the order's ledger.
    pub async fn add_order_payment(
        &self,
        ctx: &OwnerContext,
        id: OrderId,
        amount: u64,
        method: Option<PaymentMethod>,
    ) -> ServiceResult<Order> {
        let owner = ctx.require_owner()?;
        let now = Utc::now();
        let mut order: Order = load_active(&self.store, owner, &id, "order").await?;
        order.add_payment(
            PaymentEntry {
                amount,
                method,
                paid_at: now,
            },
            now,
        )?;
        self.store
            .put(Order::COLLECTION, &id.to_string(), to_doc(&order)?)
            .await?;
        Ok(order)
    }

    async fn apply_customer_stats(
        &self,
        owner: &OwnerId,
        customer_id: CustomerId,
        order: &Order,
    ) -> ServiceResult<()> {
        let now = Utc::now();
        let result: ServiceResult<()> = async {
            let mut customer: Customer =
                load_active(&self.store, owner, &customer_id, "customer").await?;
            customer.record_paid_order(order.price(), now)?;
            self.store
                .patch(
                    Customer::COLLECTION,
                    &customer_id.to_string(),
                    serde_json::json!({
                        "total_orders": customer.total_orders(),
                        "total_spent": customer.total_spent(),
                        "updated_at": now,
                    }),
                )
                .await?;
            Ok(())
        }
        .await;

        result.map_err(|err| {
            warn!(
                customer = %customer_id,
                order = %order.id(),
                error = %err,
                "customer totals not updated"
            );
            ServiceError::CustomerStatsFailed {
                customer_id,
                order_id: *order.id(),
                reason: err.to_string(),
            }
        })
    }
}
