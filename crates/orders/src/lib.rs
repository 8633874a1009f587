//! Orders domain module.
//!
//! This crate contains business rules for customer orders, implemented purely
//! as deterministic domain logic (no IO, no storage).

pub mod order;

pub use order::{
    Attachment, ExchangeDetails, NewOrder, Order, OrderPatch, OrderStatus,
};
