//! In-memory [`DocumentStore`] backend.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, RwLock};

use serde_json::Value as JsonValue;

use crate::config::StoreConfig;
use crate::document_store::{DocumentStore, OrderBy, SortOrder, StoreError};
use crate::watch::{ChangeKind, ChangeNotification, Subscription};

#[derive(Debug, Clone)]
struct VersionedDoc {
    revision: u64,
    data: JsonValue,
}

/// In-memory document store.
///
/// Intended for tests/dev. Not optimized for performance. Each document
/// carries a revision counter; `transact` commits only if the revision it
/// read is still current, retrying up to the configured attempt budget.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, VersionedDoc>>>,
    watchers: Mutex<HashMap<String, Vec<Sender<ChangeNotification>>>>,
    config: StoreConfig,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }

    fn notify(&self, collection: &str, id: &str, kind: ChangeKind, doc: &JsonValue) {
        // A poisoned watcher lock only silences notifications; the write
        // itself already committed.
        if let Ok(mut watchers) = self.watchers.lock() {
            if let Some(senders) = watchers.get_mut(collection) {
                let notification = ChangeNotification {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    kind,
                    doc: doc.clone(),
                };
                // Drop any dead subscribers while publishing.
                senders.retain(|tx| tx.send(notification.clone()).is_ok());
            }
        }
    }
}

/// Total order over the JSON values the store sorts on: null, then booleans,
/// numbers, strings. Arrays and objects are not meaningful sort keys; they
/// compare equal within their kind so the (stable) sort leaves them in place.
fn cmp_json(left: &JsonValue, right: &JsonValue) -> Ordering {
    fn rank(value: &JsonValue) -> u8 {
        match value {
            JsonValue::Null => 0,
            JsonValue::Bool(_) => 1,
            JsonValue::Number(_) => 2,
            JsonValue::String(_) => 3,
            JsonValue::Array(_) => 4,
            JsonValue::Object(_) => 5,
        }
    }

    match (left, right) {
        (JsonValue::Bool(a), JsonValue::Bool(b)) => a.cmp(b),
        (JsonValue::Number(a), JsonValue::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(a), JsonValue::String(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<JsonValue>, StoreError> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| doc.data.clone()))
    }

    async fn put(&self, collection: &str, id: &str, doc: JsonValue) -> Result<(), StoreError> {
        let kind;
        {
            let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
            let docs = collections.entry(collection.to_string()).or_default();
            let revision = docs.get(id).map(|existing| existing.revision + 1).unwrap_or(1);
            kind = if revision == 1 {
                ChangeKind::Created
            } else {
                ChangeKind::Updated
            };
            docs.insert(
                id.to_string(),
                VersionedDoc {
                    revision,
                    data: doc.clone(),
                },
            );
        }
        self.notify(collection, id, kind, &doc);
        Ok(())
    }

    async fn patch(&self, collection: &str, id: &str, fields: JsonValue) -> Result<(), StoreError> {
        let JsonValue::Object(fields) = fields else {
            return Err(StoreError::Serialization(format!(
                "patch for '{collection}/{id}' must be a JSON object"
            )));
        };

        let merged;
        {
            let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::MissingDocument {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            let JsonValue::Object(target) = &mut doc.data else {
                return Err(StoreError::Serialization(format!(
                    "document '{collection}/{id}' is not a JSON object"
                )));
            };
            for (field, value) in fields {
                // Null is a value here: it clears the field without removing it.
                target.insert(field, value);
            }
            doc.revision += 1;
            merged = doc.data.clone();
        }
        self.notify(collection, id, ChangeKind::Updated, &merged);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[(&str, JsonValue)],
        order_by: Option<OrderBy>,
    ) -> Result<Vec<JsonValue>, StoreError> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<JsonValue> = docs
            .values()
            .filter(|doc| {
                filters.iter().all(|(field, expected)| {
                    // A field absent from the document compares as null.
                    doc.data.get(*field).unwrap_or(&JsonValue::Null) == expected
                })
            })
            .map(|doc| doc.data.clone())
            .collect();

        if let Some(order_by) = order_by {
            matches.sort_by(|a, b| {
                let left = a.get(&order_by.field).unwrap_or(&JsonValue::Null);
                let right = b.get(&order_by.field).unwrap_or(&JsonValue::Null);
                match order_by.order {
                    SortOrder::Ascending => cmp_json(left, right),
                    SortOrder::Descending => cmp_json(left, right).reverse(),
                }
            });
        }

        Ok(matches)
    }

    async fn transact<F>(
        &self,
        collection: &str,
        id: &str,
        mut update: F,
    ) -> Result<JsonValue, StoreError>
    where
        F: FnMut(Option<JsonValue>) -> Result<JsonValue, StoreError> + Send,
    {
        for attempt in 1..=self.config.transaction_max_attempts {
            let snapshot = {
                let collections = self.collections.read().map_err(|_| Self::poisoned())?;
                collections
                    .get(collection)
                    .and_then(|docs| docs.get(id))
                    .map(|doc| (doc.revision, doc.data.clone()))
            };

            let observed_revision = snapshot.as_ref().map(|(revision, _)| *revision);
            let next = update(snapshot.map(|(_, data)| data))?;

            {
                let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
                let docs = collections.entry(collection.to_string()).or_default();
                let current_revision = docs.get(id).map(|doc| doc.revision);

                if current_revision == observed_revision {
                    let revision = current_revision.unwrap_or(0) + 1;
                    docs.insert(
                        id.to_string(),
                        VersionedDoc {
                            revision,
                            data: next.clone(),
                        },
                    );
                    let kind = if observed_revision.is_some() {
                        ChangeKind::Updated
                    } else {
                        ChangeKind::Created
                    };
                    drop(collections);
                    self.notify(collection, id, kind, &next);
                    return Ok(next);
                }
            }

            tracing::debug!(collection, id, attempt, "transaction lost the commit race, retrying");
        }

        Err(StoreError::Conflict(format!(
            "gave up on '{collection}/{id}' after {} attempts",
            self.config.transaction_max_attempts
        )))
    }

    fn watch(&self, collection: &str) -> Subscription<ChangeNotification> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive notifications until the process restarts.
        if let Ok(mut watchers) = self.watchers.lock() {
            watchers.entry(collection.to_string()).or_default().push(tx);
        }

        Subscription::new(rx)
    }
}
