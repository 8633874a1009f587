use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{CustomerId, DomainError, DomainResult, OwnerId, Record};

/// Input for creating a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
            birthday: None,
            notes: None,
        }
    }
}

/// A customer, with denormalized order statistics.
///
/// `total_orders`/`total_spent` are maintained by the order side exactly once
/// per order that starts life with a payment; they are a reporting
/// convenience, not a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    id: CustomerId,
    owner_id: OwnerId,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    birthday: Option<NaiveDate>,
    notes: Option<String>,
    total_orders: u32,
    total_spent: u64, // Amount in smallest currency unit (e.g., cents)
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn create(
        id: CustomerId,
        owner_id: OwnerId,
        new: NewCustomer,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        Ok(Self {
            id,
            owner_id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            birthday: new.birthday,
            notes: new.notes,
            total_orders: 0,
            total_spent: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Fold one paying order into the running totals.
    pub fn record_paid_order(&mut self, order_price: u64, now: DateTime<Utc>) -> DomainResult<()> {
        self.total_orders = self
            .total_orders
            .checked_add(1)
            .ok_or_else(|| DomainError::invariant("total orders overflow"))?;
        self.total_spent = self
            .total_spent
            .checked_add(order_price)
            .ok_or_else(|| DomainError::invariant("total spent overflow"))?;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn birthday(&self) -> Option<NaiveDate> {
        self.birthday
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn total_orders(&self) -> u32 {
        self.total_orders
    }

    pub fn total_spent(&self) -> u64 {
        self.total_spent
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for Customer {
    const COLLECTION: &'static str = "customers";
    type Id = CustomerId;

    fn id(&self) -> &CustomerId {
        &self.id
    }

    fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}
