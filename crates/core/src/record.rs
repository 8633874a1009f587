//! Record trait: the shape every stored document shares.

use chrono::{DateTime, Utc};

use crate::id::OwnerId;

/// Minimal interface of an owner-scoped, soft-deletable document.
///
/// Implemented by the aggregate types that live in their own collection.
/// The service layer leans on this to enforce ownership and tombstone
/// checks uniformly on every load.
pub trait Record {
    /// Collection the record lives in.
    const COLLECTION: &'static str;

    /// Strongly-typed record identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the record identifier.
    fn id(&self) -> &Self::Id;

    /// Owner the record is scoped to.
    fn owner_id(&self) -> &OwnerId;

    /// Soft-delete timestamp, if the record has been deleted.
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}
