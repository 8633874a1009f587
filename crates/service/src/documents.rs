//! Serde bridge between aggregates and stored JSON documents.

use atelier_core::{OwnerId, Record};
use atelier_store::{DocumentStore, OrderBy};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::ServiceError;

pub(crate) fn to_doc<T: Serialize>(record: &T) -> Result<JsonValue, ServiceError> {
    serde_json::to_value(record).map_err(|err| ServiceError::Serialization(err.to_string()))
}

pub(crate) fn from_doc<T: DeserializeOwned>(doc: JsonValue) -> Result<T, ServiceError> {
    serde_json::from_value(doc).map_err(|err| ServiceError::Serialization(err.to_string()))
}

/// Load a record by id, enforcing ownership and the tombstone filter.
///
/// A record owned by someone else is `Unauthorized` even though it exists;
/// absent and soft-deleted records are both `NotFound(label)`.
pub(crate) async fn load_active<R, S>(
    store: &S,
    owner: &OwnerId,
    id: &R::Id,
    label: &'static str,
) -> Result<R, ServiceError>
where
    R: Record + DeserializeOwned,
    S: DocumentStore,
{
    let Some(doc) = store.get(R::COLLECTION, &id.to_string()).await? else {
        return Err(ServiceError::NotFound(label));
    };
    let record: R = from_doc(doc)?;
    if record.owner_id() != owner {
        return Err(ServiceError::Unauthorized);
    }
    if record.is_deleted() {
        return Err(ServiceError::NotFound(label));
    }
    Ok(record)
}

/// All live records of one owner, newest first.
pub(crate) async fn list_active<R, S>(store: &S, owner: &OwnerId) -> Result<Vec<R>, ServiceError>
where
    R: Record + DeserializeOwned,
    S: DocumentStore,
{
    let docs = store
        .query(
            R::COLLECTION,
            &[
                ("owner_id", JsonValue::from(owner.as_str())),
                ("deleted_at", JsonValue::Null),
            ],
            Some(OrderBy::desc("created_at")),
        )
        .await?;
    docs.into_iter().map(from_doc).collect()
}
