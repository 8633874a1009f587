//! Sequential numbering for human-facing record labels.
//!
//! Counters are plain documents, one per `(owner, kind)` pair, mutated only
//! through the allocator's atomic increment. Formatting lives here so the
//! label scheme has exactly one definition.

pub mod counter;

pub use counter::{
    COUNTERS_COLLECTION, SequenceCounter, SequenceKind, counter_document_id, format_order_number,
    format_quote_number,
};
