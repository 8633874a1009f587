//! Quotes domain module.
//!
//! This crate contains business rules for pre-order quotes, implemented
//! purely as deterministic domain logic (no IO, no storage).

pub mod quote;

pub use quote::{NewQuote, Quote, QuotePatch, QuoteStatus};
