use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use atelier_catalog::{LineItem, MAX_AMOUNT, items_total, product_summary, validate_items};
use atelier_core::{CustomerId, DomainError, DomainResult, OrderId, OwnerId, Patch, QuoteId, Record};
use atelier_ledger::{PaymentEntry, PaymentLedger, PaymentMethod};
use atelier_workflow::{ProductionStep, ProductionWorkflow};

/// Order status lifecycle.
///
/// `cancelled` is the only terminal state; the other three may be set freely,
/// and workflow completion can advance (never regress) them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Transition validity, independent of what any UI happens to render.
    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        from != OrderStatus::Cancelled || to == OrderStatus::Cancelled
    }

    pub fn is_terminal(&self) -> bool {
        *self == OrderStatus::Cancelled
    }
}

/// Uploaded file reference attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub url: String,
}

/// Details of an exchange (barter) order's in-kind consideration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDetails {
    pub description: String,
    /// Informational only; never feeds the ledger.
    pub estimated_value: Option<u64>,
}

/// Input for creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: Option<CustomerId>,
    pub items: Vec<LineItem>,
    pub delivery_date: NaiveDate,
    pub notes: Option<String>,
    pub production_cost: Option<u64>,
    pub real_cost: Option<u64>,
    pub paid_amount: u64,
    pub payment_method: Option<PaymentMethod>,
    pub is_exchange: bool,
    pub exchange_details: Option<ExchangeDetails>,
    pub attachments: Option<Vec<Attachment>>,
    /// Explicit total, used when the order price is not the plain items sum
    /// (e.g. a discounted quote total). Defaults to the items-derived total.
    pub price: Option<u64>,
    /// Quote this order was generated from, if any.
    pub source_quote_id: Option<QuoteId>,
}

impl NewOrder {
    pub fn new(items: Vec<LineItem>, delivery_date: NaiveDate) -> Self {
        Self {
            customer_id: None,
            items,
            delivery_date,
            notes: None,
            production_cost: None,
            real_cost: None,
            paid_amount: 0,
            payment_method: None,
            is_exchange: false,
            exchange_details: None,
            attachments: None,
            price: None,
            source_quote_id: None,
        }
    }
}

/// Partial update of an order.
///
/// Absent fields leave the stored value untouched; explicit `null` clears it
/// where clearing is meaningful (see [`Patch`]). Pricing-affecting fields
/// (items, paid amount, exchange flag) force a ledger recompute.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub customer_id: Patch<CustomerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub production_cost: Patch<u64>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub real_cost: Patch<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub payment_method: Patch<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub payment_date: Patch<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub notes: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub attachments: Patch<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_exchange: Option<bool>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub exchange_details: Patch<ExchangeDetails>,
}

impl OrderPatch {
    /// Whether applying this patch requires re-deriving price and ledger.
    pub fn touches_pricing(&self) -> bool {
        self.items.is_some() || self.paid_amount.is_some() || self.is_exchange.is_some()
    }
}

/// Aggregate root: Order.
///
/// Structured items are the source of truth; `product_summary` and `price`
/// are projections regenerated on every item edit, never parsed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    owner_id: OwnerId,
    number: String,
    status: OrderStatus,
    customer_id: Option<CustomerId>,
    items: Vec<LineItem>,
    product_summary: String,
    price: u64, // Total in smallest currency unit (e.g., cents)
    production_cost: Option<u64>,
    real_cost: Option<u64>,
    delivery_date: NaiveDate,
    notes: Option<String>,
    ledger: Option<PaymentLedger>,
    workflow: Option<ProductionWorkflow>,
    attachments: Option<Vec<Attachment>>,
    is_exchange: bool,
    exchange_details: Option<ExchangeDetails>,
    source_quote_id: Option<QuoteId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create an order with an already-allocated number.
    ///
    /// Status starts at `pending` and no workflow is attached; production is
    /// started explicitly via [`Order::attach_workflow`].
    pub fn create(
        id: OrderId,
        owner_id: OwnerId,
        number: String,
        new: NewOrder,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_items(&new.items)?;
        validate_money("price", new.price)?;
        validate_money("production cost", new.production_cost)?;
        validate_money("real cost", new.real_cost)?;
        validate_money("paid amount", Some(new.paid_amount))?;

        let price = match new.price {
            Some(price) => price,
            None => items_total(&new.items)?,
        };
        let ledger = if new.is_exchange {
            PaymentLedger::exchange()
        } else {
            let mut ledger = PaymentLedger::from_amounts(price, new.paid_amount);
            ledger.set_method(new.payment_method);
            if new.paid_amount > 0 {
                ledger.set_payment_date(Some(now));
            }
            ledger
        };

        Ok(Self {
            id,
            owner_id,
            number,
            status: OrderStatus::Pending,
            customer_id: new.customer_id,
            product_summary: product_summary(&new.items),
            items: new.items,
            price,
            production_cost: new.production_cost,
            real_cost: new.real_cost,
            delivery_date: new.delivery_date,
            notes: new.notes,
            ledger: Some(ledger),
            workflow: None,
            attachments: new.attachments,
            is_exchange: new.is_exchange,
            exchange_details: new.exchange_details,
            source_quote_id: new.source_quote_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Apply a partial update.
    ///
    /// Validations run before any field is written, so a rejected patch
    /// leaves the order untouched.
    pub fn apply_patch(&mut self, patch: OrderPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(items) = &patch.items {
            validate_items(items)?;
        }
        validate_money("production cost", patch.production_cost.set_value().copied())?;
        validate_money("real cost", patch.real_cost.set_value().copied())?;
        validate_money("paid amount", patch.paid_amount)?;
        if let Some(to) = patch.status {
            if !OrderStatus::can_transition(self.status, to) {
                return Err(DomainError::conflict(format!(
                    "order {} is cancelled and cannot change status",
                    self.number
                )));
            }
        }

        let items_changed = patch.items.is_some();
        let recompute = patch.touches_pricing();

        if let Some(items) = patch.items {
            self.items = items;
        }
        patch.customer_id.apply(&mut self.customer_id);
        if let Some(delivery_date) = patch.delivery_date {
            self.delivery_date = delivery_date;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        patch.production_cost.apply(&mut self.production_cost);
        patch.real_cost.apply(&mut self.real_cost);
        patch.notes.apply(&mut self.notes);
        patch.attachments.apply(&mut self.attachments);
        if let Some(is_exchange) = patch.is_exchange {
            self.is_exchange = is_exchange;
        }
        patch.exchange_details.apply(&mut self.exchange_details);

        if !patch.payment_method.is_keep() || !patch.payment_date.is_keep() {
            let ledger = self.ensure_ledger();
            if !patch.payment_method.is_keep() {
                let method = patch.payment_method.resolve(ledger.method());
                ledger.set_method(method);
            }
            if !patch.payment_date.is_keep() {
                let payment_date = patch.payment_date.resolve(ledger.payment_date());
                ledger.set_payment_date(payment_date);
            }
        }

        if items_changed {
            self.price = items_total(&self.items)?;
            self.product_summary = product_summary(&self.items);
        }
        if recompute {
            self.refresh_ledger(patch.paid_amount);
        }
        self.advance_status_from_workflow();
        self.updated_at = now;
        Ok(())
    }

    /// Attach a fresh production workflow. Rejected for cancelled orders and
    /// when a workflow is already present.
    pub fn attach_workflow(
        &mut self,
        estimated_completion_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status == OrderStatus::Cancelled {
            return Err(DomainError::invariant(
                "cancelled orders cannot start production",
            ));
        }
        if self.workflow.is_some() {
            return Err(DomainError::conflict(
                "production workflow already attached",
            ));
        }
        self.workflow = Some(ProductionWorkflow::attached(now, estimated_completion_date));
        self.updated_at = now;
        Ok(())
    }

    /// Toggle one production step and re-derive order status.
    pub fn set_step_completion(
        &mut self,
        step: ProductionStep,
        completed: bool,
        completed_by: &OwnerId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let Some(workflow) = self.workflow.as_mut() else {
            return Err(DomainError::invariant("order has no production workflow"));
        };
        workflow.set_step_completion(step, completed, completed_by, notes, now);
        self.advance_status_from_workflow();
        self.updated_at = now;
        Ok(())
    }

    /// Record a discrete payment against the order.
    pub fn add_payment(&mut self, entry: PaymentEntry, now: DateTime<Utc>) -> DomainResult<()> {
        if self.is_exchange {
            return Err(DomainError::invariant(
                "exchange orders do not track payments",
            ));
        }
        validate_money("payment amount", Some(entry.amount))?;
        let price = self.price;
        self.ensure_ledger().add_payment(entry, price)?;
        self.updated_at = now;
        Ok(())
    }

    /// Copy of this order under a new identity, reset for a fresh run:
    /// status `pending`, zero-paid ledger, no workflow, no attachments.
    pub fn duplicate_as(&self, id: OrderId, number: String, now: DateTime<Utc>) -> Order {
        let ledger = if self.is_exchange {
            PaymentLedger::exchange()
        } else {
            PaymentLedger::from_amounts(self.price, 0)
        };
        Order {
            id,
            owner_id: self.owner_id.clone(),
            number,
            status: OrderStatus::Pending,
            customer_id: self.customer_id,
            items: self.items.clone(),
            product_summary: self.product_summary.clone(),
            price: self.price,
            production_cost: self.production_cost,
            real_cost: self.real_cost,
            delivery_date: self.delivery_date,
            notes: self.notes.clone(),
            ledger: Some(ledger),
            workflow: None,
            attachments: None,
            is_exchange: self.is_exchange,
            exchange_details: self.exchange_details.clone(),
            source_quote_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    fn ensure_ledger(&mut self) -> &mut PaymentLedger {
        let price = self.price;
        self.ledger
            .get_or_insert_with(|| PaymentLedger::from_amounts(price, 0))
    }

    fn refresh_ledger(&mut self, paid_amount: Option<u64>) {
        if self.is_exchange {
            self.ledger = Some(PaymentLedger::exchange());
            return;
        }
        let price = self.price;
        let ledger = self.ensure_ledger();
        let paid = paid_amount.unwrap_or_else(|| ledger.paid_amount());
        ledger.recompute(price, paid);
    }

    /// Workflow-driven status advancement. Runs after every workflow or
    /// status edit; cancelled orders are excluded, and completion state is
    /// never regressed by un-checking steps.
    fn advance_status_from_workflow(&mut self) {
        let Some(workflow) = &self.workflow else {
            return;
        };
        if self.status == OrderStatus::Cancelled {
            return;
        }
        if workflow.is_complete() {
            self.status = OrderStatus::Completed;
        } else if workflow.completed_count() > 0 && self.status == OrderStatus::Pending {
            self.status = OrderStatus::InProgress;
        }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn product_summary(&self) -> &str {
        &self.product_summary
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn production_cost(&self) -> Option<u64> {
        self.production_cost
    }

    pub fn real_cost(&self) -> Option<u64> {
        self.real_cost
    }

    pub fn delivery_date(&self) -> NaiveDate {
        self.delivery_date
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn ledger(&self) -> Option<&PaymentLedger> {
        self.ledger.as_ref()
    }

    pub fn workflow(&self) -> Option<&ProductionWorkflow> {
        self.workflow.as_ref()
    }

    pub fn attachments(&self) -> Option<&[Attachment]> {
        self.attachments.as_deref()
    }

    pub fn is_exchange(&self) -> bool {
        self.is_exchange
    }

    pub fn exchange_details(&self) -> Option<&ExchangeDetails> {
        self.exchange_details.as_ref()
    }

    pub fn source_quote_id(&self) -> Option<QuoteId> {
        self.source_quote_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for Order {
    const COLLECTION: &'static str = "orders";
    type Id = OrderId;

    fn id(&self) -> &OrderId {
        &self.id
    }

    fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

fn validate_money(label: &str, amount: Option<u64>) -> DomainResult<()> {
    match amount {
        Some(amount) if amount > MAX_AMOUNT => Err(DomainError::validation(format!(
            "{label} exceeds maximum ({MAX_AMOUNT})"
        ))),
        _ => Ok(()),
    }
}
