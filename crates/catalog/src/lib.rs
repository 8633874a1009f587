//! Line items and pricing derivations.
//!
//! This crate contains the structured item model shared by orders and quotes,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod discount;
pub mod item;

pub use discount::{Discount, DiscountKind, discounted_total};
pub use item::{
    LineItem, MAX_AMOUNT, MAX_QUANTITY, items_total, product_summary, validate_items,
};
