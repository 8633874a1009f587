//! The document store contract.
//!
//! Records live in named collections, keyed by a string id, stored as JSON
//! documents. The trait is deliberately small: the five operations below plus
//! a change subscription are everything the service layer consumes, which
//! keeps alternative backends honest about what they must provide.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::watch::{ChangeNotification, Subscription};

/// Storage operation error.
///
/// These are **infrastructure errors** (contention, absent patch targets,
/// serialization, backend faults) as opposed to domain errors (validation,
/// invariants). The service layer translates them into its own taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A one-record transaction lost every retry to concurrent writers.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// `patch` targeted a document that does not exist. Patches never
    /// create documents; `put` does.
    #[error("no document '{id}' in collection '{collection}'")]
    MissingDocument { collection: String, id: String },

    /// A document or patch body could not be interpreted.
    #[error("document serialization failed: {0}")]
    Serialization(String),

    /// The backend itself failed (poisoned lock, connection loss, ...).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Sort direction for `query` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sort key for `query` results.
///
/// Sorting compares the named top-level field across documents. Timestamps
/// are stored as RFC 3339 strings, which order lexicographically the same as
/// chronologically, so `OrderBy::desc("created_at")` yields newest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }
}

/// Collection/document storage with equality queries, top-level patches,
/// a one-record transaction, and change subscriptions.
///
/// ## Semantics implementations must honor
///
/// - `put` is an upsert: it writes the full document, creating or replacing.
/// - `patch` merges the given fields into an **existing** document at the
///   top level. A field whose value is JSON null is stored as null, not
///   removed; absence from the patch body means "leave untouched". Patching
///   an absent document fails with [`StoreError::MissingDocument`].
/// - `query` matches documents whose named top-level fields equal the given
///   values (a field absent from a document compares as null). Results may
///   be sorted by one top-level field.
/// - `transact` runs a read-modify-write cycle against a single document
///   under optimistic concurrency: the closure sees the current document (or
///   `None`), returns the replacement, and the write commits only if no
///   other writer got in between. Implementations retry a bounded number of
///   times and then fail with [`StoreError::Conflict`]. The closure may run
///   more than once and must not carry side effects.
/// - `watch` subscribes to committed writes on one collection. Every
///   subscriber receives every notification published after it subscribed.
///
/// There is no delete operation. Records are retired by patching a
/// tombstone field, which keeps them queryable and the change feed complete.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, or `None` if the id is unknown.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<JsonValue>, StoreError>;

    /// Write a full document, creating or replacing it.
    async fn put(&self, collection: &str, id: &str, doc: JsonValue) -> Result<(), StoreError>;

    /// Merge `fields` into an existing document at the top level.
    ///
    /// `fields` must be a JSON object. Null values are stored verbatim.
    async fn patch(&self, collection: &str, id: &str, fields: JsonValue) -> Result<(), StoreError>;

    /// Return documents whose fields equal every `(field, value)` filter,
    /// optionally sorted.
    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, JsonValue)],
        order_by: Option<OrderBy>,
    ) -> Result<Vec<JsonValue>, StoreError>;

    /// Atomically read-modify-write one document.
    ///
    /// Returns the committed document. The closure may be invoked once per
    /// retry attempt.
    async fn transact<F>(
        &self,
        collection: &str,
        id: &str,
        update: F,
    ) -> Result<JsonValue, StoreError>
    where
        F: FnMut(Option<JsonValue>) -> Result<JsonValue, StoreError> + Send;

    /// Subscribe to committed writes on `collection`.
    fn watch(&self, collection: &str) -> Subscription<ChangeNotification>;
}

#[async_trait::async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get(&self, collection: &str, id: &str) -> Result<Option<JsonValue>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn put(&self, collection: &str, id: &str, doc: JsonValue) -> Result<(), StoreError> {
        (**self).put(collection, id, doc).await
    }

    async fn patch(&self, collection: &str, id: &str, fields: JsonValue) -> Result<(), StoreError> {
        (**self).patch(collection, id, fields).await
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, JsonValue)],
        order_by: Option<OrderBy>,
    ) -> Result<Vec<JsonValue>, StoreError> {
        (**self).query(collection, filters, order_by).await
    }

    async fn transact<F>(
        &self,
        collection: &str,
        id: &str,
        update: F,
    ) -> Result<JsonValue, StoreError>
    where
        F: FnMut(Option<JsonValue>) -> Result<JsonValue, StoreError> + Send,
    {
        (**self).transact(collection, id, update).await
    }

    fn watch(&self, collection: &str) -> Subscription<ChangeNotification> {
        (**self).watch(collection)
    }
}
