//! Caller identity.

use atelier_core::OwnerId;

use crate::error::ServiceError;

/// Identity a service operation runs under.
///
/// The UI authenticates the workshop owner and passes the resulting context
/// into every call. Operations that reach storage first demand an owner via
/// [`OwnerContext::require_owner`]; an anonymous context fails there, before
/// anything is read or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerContext {
    owner_id: Option<OwnerId>,
}

impl OwnerContext {
    pub fn authenticated(owner_id: OwnerId) -> Self {
        Self {
            owner_id: Some(owner_id),
        }
    }

    pub fn anonymous() -> Self {
        Self { owner_id: None }
    }

    pub fn owner_id(&self) -> Option<&OwnerId> {
        self.owner_id.as_ref()
    }

    /// The owner this call runs on behalf of, or `Unauthorized`.
    pub fn require_owner(&self) -> Result<&OwnerId, ServiceError> {
        self.owner_id.as_ref().ok_or(ServiceError::Unauthorized)
    }
}
