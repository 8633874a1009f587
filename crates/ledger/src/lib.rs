//! Payment tracking for orders.
//!
//! The ledger never decides amounts; it derives status from whatever totals
//! the owning record feeds it, and keeps that derivation in exactly one place.

pub mod payment;

pub use payment::{PaymentEntry, PaymentLedger, PaymentMethod, PaymentStatus};
