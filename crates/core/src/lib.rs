//! `atelier-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no storage concerns).

pub mod error;
pub mod id;
pub mod patch;
pub mod record;

pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, OrderId, OwnerId, QuoteId};
pub use patch::Patch;
pub use record::Record;
