//! Sequence number allocation.

use atelier_core::OwnerId;
use atelier_numbering::{
    COUNTERS_COLLECTION, SequenceCounter, SequenceKind, counter_document_id, format_order_number,
    format_quote_number,
};
use atelier_store::{DocumentStore, StoreError};

use crate::documents::from_doc;
use crate::error::{ServiceError, ServiceResult};

/// Hands out duplicate-free, strictly increasing sequence counts.
///
/// One counter document per `(owner, kind)` pair, bumped through the store's
/// one-record transaction, so two concurrent callers never observe the same
/// count. Gaps are fine (a count consumed by a creation that later failed is
/// simply never used); duplicates are not. When the transaction cannot
/// commit within the store's retry budget the allocation fails with
/// [`ServiceError::AllocationConflict`] and the caller must not create the
/// entity the number was meant for.
#[derive(Debug, Clone)]
pub struct SequenceAllocator<S> {
    store: S,
}

impl<S: DocumentStore> SequenceAllocator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Bump the counter for `(owner, kind)` and return the new count.
    pub async fn next_count(&self, owner: &OwnerId, kind: SequenceKind) -> ServiceResult<u64> {
        let doc_id = counter_document_id(owner, kind);
        let committed = self
            .store
            .transact(COUNTERS_COLLECTION, &doc_id, |current| {
                let counter = match current {
                    Some(doc) => serde_json::from_value::<SequenceCounter>(doc)
                        .map_err(|err| StoreError::Serialization(err.to_string()))?,
                    None => SequenceCounter::default(),
                };
                serde_json::to_value(counter.incremented())
                    .map_err(|err| StoreError::Serialization(err.to_string()))
            })
            .await
            .map_err(|err| match err {
                StoreError::Conflict(msg) => ServiceError::AllocationConflict(msg),
                other => ServiceError::Store(other),
            })?;

        let counter: SequenceCounter = from_doc(committed)?;
        Ok(counter.count)
    }

    /// Allocate the next formatted number for `kind`.
    ///
    /// `year` only shows up in order numbers; quote numbers ignore it.
    pub async fn allocate(
        &self,
        owner: &OwnerId,
        kind: SequenceKind,
        year: i32,
    ) -> ServiceResult<String> {
        let count = self.next_count(owner, kind).await?;
        Ok(match kind {
            SequenceKind::Orders => format_order_number(year, count),
            SequenceKind::Quotes => format_quote_number(count),
        })
    }
}
