//! Service error model.

use atelier_core::{CustomerId, DomainError, OrderId, QuoteId};
use atelier_store::StoreError;
use thiserror::Error;

/// Result type used across the service layer.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error surfaced to service callers.
///
/// Every failure names what went wrong in caller terms: which class of
/// problem, and for the two multi-write operations, which aggregate was
/// left behind. Domain and storage errors are converted on the way out so
/// callers only ever match on this enum.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No authenticated owner, or the record belongs to a different owner.
    #[error("operation requires an authenticated owner")]
    Unauthorized,

    /// The record does not exist for this owner. Soft-deleted records
    /// count as absent.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The sequence counter transaction lost its retry budget. The entity
    /// the number was meant for was not written; a non-unique number is
    /// never handed out as a fallback.
    #[error("could not allocate a sequence number: {0}")]
    AllocationConflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("record serialization failed: {0}")]
    Serialization(String),

    /// The order was written but the quote could not be marked approved.
    /// Approving the same quote again resumes from the existing order
    /// instead of creating a second one.
    #[error("order {order_id} written but quote {quote_id} not marked approved: {reason}")]
    QuoteApprovalIncomplete {
        quote_id: QuoteId,
        order_id: OrderId,
        reason: String,
    },

    /// The order was written but the customer's running totals were not.
    #[error("customer {customer_id} totals not updated for order {order_id}: {reason}")]
    CustomerStatsFailed {
        customer_id: CustomerId,
        order_id: OrderId,
        reason: String,
    },

    /// Storage failed for a reason the service does not reinterpret.
    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::Invariant(msg),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::NotFound => ServiceError::NotFound("record"),
            DomainError::Unauthorized => ServiceError::Unauthorized,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err)
    }
}
