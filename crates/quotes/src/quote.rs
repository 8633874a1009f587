use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use atelier_catalog::{Discount, LineItem, discounted_total, validate_items};
use atelier_core::{CustomerId, DomainError, DomainResult, OrderId, OwnerId, Patch, QuoteId, Record};

/// Quote status lifecycle.
///
/// `draft`, `sent`, `rejected` and `expired` move freely among themselves;
/// `approved` is terminal and is the only status that may create an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
    Expired,
}

impl QuoteStatus {
    /// Transition validity, independent of what any UI happens to render.
    pub fn can_transition(from: QuoteStatus, to: QuoteStatus) -> bool {
        from != QuoteStatus::Approved || to == QuoteStatus::Approved
    }

    pub fn is_terminal(&self) -> bool {
        *self == QuoteStatus::Approved
    }
}

/// Input for creating a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuote {
    pub customer_id: Option<CustomerId>,
    pub items: Vec<LineItem>,
    pub discount: Option<Discount>,
    pub delivery_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewQuote {
    pub fn new(items: Vec<LineItem>) -> Self {
        Self {
            customer_id: None,
            items,
            discount: None,
            delivery_date: None,
            valid_until: None,
            notes: None,
        }
    }
}

/// Partial update of a quote. Same absent/null/value semantics as order
/// patches; `status` cannot be patched to `approved` (approval is a separate
/// operation because it creates an order).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuotePatch {
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub customer_id: Patch<CustomerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LineItem>>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub discount: Patch<Discount>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub delivery_date: Patch<NaiveDate>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub valid_until: Patch<NaiveDate>,
    #[serde(default, skip_serializing_if = "Patch::is_keep")]
    pub notes: Patch<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QuoteStatus>,
}

impl QuotePatch {
    /// Whether applying this patch requires re-deriving the total.
    pub fn touches_pricing(&self) -> bool {
        self.items.is_some() || !self.discount.is_keep()
    }
}

/// Aggregate root: Quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    id: QuoteId,
    owner_id: OwnerId,
    number: String,
    status: QuoteStatus,
    customer_id: Option<CustomerId>,
    items: Vec<LineItem>,
    discount: Option<Discount>,
    total: u64, // Discounted total in smallest currency unit (e.g., cents)
    delivery_date: Option<NaiveDate>,
    valid_until: Option<NaiveDate>,
    notes: Option<String>,
    linked_order_id: Option<OrderId>,
    linked_order_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Quote {
    /// Create a draft quote with an already-allocated number.
    pub fn create(
        id: QuoteId,
        owner_id: OwnerId,
        number: String,
        new: NewQuote,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate_items(&new.items)?;
        let total = discounted_total(&new.items, new.discount.as_ref())?;
        Ok(Self {
            id,
            owner_id,
            number,
            status: QuoteStatus::Draft,
            customer_id: new.customer_id,
            items: new.items,
            discount: new.discount,
            total,
            delivery_date: new.delivery_date,
            valid_until: new.valid_until,
            notes: new.notes,
            linked_order_id: None,
            linked_order_number: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Apply a partial update.
    ///
    /// Approved quotes are immutable except for the order-link fields, which
    /// only [`Quote::approve`] writes.
    pub fn apply_patch(&mut self, patch: QuotePatch, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == QuoteStatus::Approved {
            return Err(DomainError::invariant("approved quotes are immutable"));
        }
        if let Some(items) = &patch.items {
            validate_items(items)?;
        }
        if let Some(discount) = patch.discount.set_value() {
            discount.validate()?;
        }
        if let Some(to) = patch.status {
            if to == QuoteStatus::Approved {
                return Err(DomainError::invariant(
                    "quotes are approved through the approval operation",
                ));
            }
            if !QuoteStatus::can_transition(self.status, to) {
                return Err(DomainError::conflict("quote status transition not allowed"));
            }
        }

        let recompute = patch.touches_pricing();
        if let Some(items) = patch.items {
            self.items = items;
        }
        patch.customer_id.apply(&mut self.customer_id);
        patch.discount.apply(&mut self.discount);
        patch.delivery_date.apply(&mut self.delivery_date);
        patch.valid_until.apply(&mut self.valid_until);
        patch.notes.apply(&mut self.notes);
        if let Some(status) = patch.status {
            self.status = status;
        }
        if recompute {
            self.total = discounted_total(&self.items, self.discount.as_ref())?;
        }
        self.updated_at = now;
        Ok(())
    }

    /// One-way transition to `approved`, recording the generated order.
    pub fn approve(
        &mut self,
        order_id: OrderId,
        order_number: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status == QuoteStatus::Approved {
            return Err(DomainError::conflict("quote is already approved"));
        }
        self.status = QuoteStatus::Approved;
        self.linked_order_id = Some(order_id);
        self.linked_order_number = Some(order_number.into());
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn discount(&self) -> Option<&Discount> {
        self.discount.as_ref()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn delivery_date(&self) -> Option<NaiveDate> {
        self.delivery_date
    }

    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.valid_until
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn linked_order_id(&self) -> Option<OrderId> {
        self.linked_order_id
    }

    pub fn linked_order_number(&self) -> Option<&str> {
        self.linked_order_number.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for Quote {
    const COLLECTION: &'static str = "quotes";
    type Id = QuoteId;

    fn id(&self) -> &QuoteId {
        &self.id
    }

    fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}
