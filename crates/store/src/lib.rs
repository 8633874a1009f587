//! Document store abstraction and in-memory implementation.
//!
//! This crate defines the persistence boundary for the workshop: a
//! collection/document store with equality queries, top-level patches, a
//! one-record transaction primitive, and change subscriptions. Domain crates
//! never talk to storage directly; the service layer drives this trait.
//!
//! The [`InMemoryStore`] implementation backs tests and development. A
//! production backend implements the same [`DocumentStore`] trait against a
//! real document database.

pub mod config;
pub mod document_store;
pub mod in_memory;
pub mod watch;

pub use config::StoreConfig;
pub use document_store::{DocumentStore, OrderBy, SortOrder, StoreError};
pub use in_memory::InMemoryStore;
pub use watch::{ChangeKind, ChangeNotification, Subscription};
