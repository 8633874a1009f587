use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{DomainError, DomainResult};

/// Derived settlement state of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Other,
}

/// One discrete payment against a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub amount: u64, // Amount in smallest currency unit (e.g., cents)
    pub method: Option<PaymentMethod>,
    pub paid_at: DateTime<Utc>,
}

/// Monetary state of one order or quote.
///
/// `remaining_amount` is signed and deliberately unclamped: an overpaid
/// ledger goes negative so the overpayment stays visible instead of being
/// silently absorbed. `status` is always a pure function of the amounts,
/// except for exchange orders where the ledger is pinned to zero/paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLedger {
    status: PaymentStatus,
    method: Option<PaymentMethod>,
    total_amount: u64,
    paid_amount: u64,
    remaining_amount: i64,
    payment_date: Option<DateTime<Utc>>,
    payments: Option<Vec<PaymentEntry>>,
}

impl PaymentLedger {
    /// Build a ledger from amounts, deriving remaining and status.
    pub fn from_amounts(total_amount: u64, paid_amount: u64) -> Self {
        let remaining_amount = Self::remaining(total_amount, paid_amount);
        Self {
            status: Self::derive_status(paid_amount, remaining_amount),
            method: None,
            total_amount,
            paid_amount,
            remaining_amount,
            payment_date: None,
            payments: None,
        }
    }

    /// Fixed ledger for exchange (barter) orders: zero value, settled.
    pub fn exchange() -> Self {
        Self {
            status: PaymentStatus::Paid,
            method: None,
            total_amount: 0,
            paid_amount: 0,
            remaining_amount: 0,
            payment_date: None,
            payments: None,
        }
    }

    /// `total - paid`, widened so the subtraction itself cannot overflow.
    pub fn remaining(total_amount: u64, paid_amount: u64) -> i64 {
        let wide = i128::from(total_amount) - i128::from(paid_amount);
        i64::try_from(wide).unwrap_or(if wide.is_negative() { i64::MIN } else { i64::MAX })
    }

    /// Pure status derivation; total over all inputs.
    pub fn derive_status(paid_amount: u64, remaining_amount: i64) -> PaymentStatus {
        if remaining_amount <= 0 {
            PaymentStatus::Paid
        } else if paid_amount > 0 {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        }
    }

    /// Re-derive amounts and status after an edit, preserving method,
    /// payment date and history.
    pub fn recompute(&mut self, total_amount: u64, paid_amount: u64) {
        self.total_amount = total_amount;
        self.paid_amount = paid_amount;
        self.remaining_amount = Self::remaining(total_amount, paid_amount);
        self.status = Self::derive_status(paid_amount, self.remaining_amount);
    }

    /// Record a discrete payment and fold it into the amounts.
    pub fn add_payment(&mut self, entry: PaymentEntry, total_amount: u64) -> DomainResult<()> {
        if entry.amount == 0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        let paid = self
            .paid_amount
            .checked_add(entry.amount)
            .ok_or_else(|| DomainError::invariant("paid amount overflow"))?;
        if entry.method.is_some() {
            self.method = entry.method;
        }
        self.payment_date = Some(entry.paid_at);
        self.payments.get_or_insert_with(Vec::new).push(entry);
        self.recompute(total_amount, paid);
        Ok(())
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn set_method(&mut self, method: Option<PaymentMethod>) {
        self.method = method;
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn paid_amount(&self) -> u64 {
        self.paid_amount
    }

    pub fn remaining_amount(&self) -> i64 {
        self.remaining_amount
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        self.payment_date
    }

    pub fn set_payment_date(&mut self, payment_date: Option<DateTime<Utc>>) {
        self.payment_date = payment_date;
    }

    pub fn payments(&self) -> Option<&[PaymentEntry]> {
        self.payments.as_deref()
    }
}
