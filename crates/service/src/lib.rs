//! Owner-scoped orchestration over the document store.
//!
//! This crate is the boundary the UI talks to. Each service wires the domain
//! aggregates (orders, quotes, customers) to a [`DocumentStore`] backend and
//! enforces the cross-cutting rules the aggregates cannot see on their own:
//!
//! - every operation runs on behalf of an authenticated owner
//!   ([`OwnerContext`]), checked before storage is touched;
//! - sequence numbers come from the [`SequenceAllocator`], whose counter
//!   bump is the only transactional operation in the system;
//! - reads filter soft-deleted records and re-check ownership;
//! - the two cross-aggregate writes (customer totals at first payment,
//!   quote approval) surface partial failure instead of swallowing it.
//!
//! [`DocumentStore`]: atelier_store::DocumentStore

pub mod allocator;
pub mod context;
pub mod customers;
mod documents;
pub mod error;
pub mod orders;
pub mod quotes;

pub use allocator::SequenceAllocator;
pub use context::OwnerContext;
pub use customers::CustomerService;
pub use error::{ServiceError, ServiceResult};
pub use orders::OrderService;
pub use quotes::QuoteService;
