use serde::{Deserialize, Serialize};

use atelier_core::OwnerId;

/// Collection the counter documents live in.
pub const COUNTERS_COLLECTION: &str = "counters";

/// Which sequence a counter feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    Orders,
    Quotes,
}

impl SequenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceKind::Orders => "orders",
            SequenceKind::Quotes => "quotes",
        }
    }
}

/// Persisted counter state, one document per `(owner, kind)` pair.
///
/// Created lazily on first allocation and never deleted. `count` is the last
/// value handed out; the next allocation stores and returns `count + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceCounter {
    pub count: u64,
}

impl SequenceCounter {
    pub fn incremented(&self) -> Self {
        Self {
            count: self.count + 1,
        }
    }
}

/// Document id of the counter for an `(owner, kind)` pair.
pub fn counter_document_id(owner: &OwnerId, kind: SequenceKind) -> String {
    format!("{}:{}", owner, kind.as_str())
}

/// Order label: `#<year>-<count>`, count zero-padded to 4 digits.
///
/// Counts past 9999 widen the field instead of truncating; the label is a
/// human-facing string, not a sort key.
pub fn format_order_number(year: i32, count: u64) -> String {
    format!("#{year:04}-{count:04}")
}

/// Quote label: `ORC-<count>`, count zero-padded to 4 digits.
pub fn format_quote_number(count: u64) -> String {
    format!("ORC-{count:04}")
}
