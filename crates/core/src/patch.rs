//! Tri-state patch fields for partial updates.
//!
//! A JSON merge-patch distinguishes three cases per field:
//!
//! - field absent: leave the stored value untouched ([`Patch::Keep`]);
//! - field `null`: clear the stored value ([`Patch::Clear`]);
//! - field present with a value: replace the stored value ([`Patch::Set`]).
//!
//! `Option<T>` cannot carry all three, so patch structs use `Patch<T>` with
//! `#[serde(default, skip_serializing_if = "Patch::is_keep")]` on each field.
//! Absence maps to `Keep` through the field default; `null` and values are
//! told apart by the `Deserialize` impl below.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One field of a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Field was absent from the patch; keep the stored value.
    #[default]
    Keep,
    /// Field was explicitly `null`; clear the stored value.
    Clear,
    /// Field carried a value; replace the stored value.
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    /// Fold the patch into an optional slot.
    pub fn apply(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *slot = None,
            Patch::Set(value) => *slot = Some(value),
        }
    }

    /// Resolve against a current value without mutating it.
    pub fn resolve(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }

    /// The carried value, if this patch sets one.
    pub fn set_value(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Keep | Patch::Clear => None,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Absent fields never reach this impl (the struct field default kicks
        // in), so anything we see is either null or a value.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Set(value) => value.serialize(serializer),
            // Keep should be skipped by the containing struct; a Keep that is
            // serialized anyway degrades to null, i.e. Clear.
            Patch::Keep | Patch::Clear => serializer.serialize_none(),
        }
    }
}
