//! Customer registry operations.

use atelier_core::{CustomerId, Record};
use atelier_customers::{Customer, NewCustomer};
use atelier_store::DocumentStore;
use chrono::Utc;
use tracing::info;

use crate::context::OwnerContext;
use crate::documents::{list_active, load_active, to_doc};
use crate::error::ServiceResult;

/// Customer registry over one storage backend.
///
/// The running totals (`total_orders`, `total_spent`) are written by the
/// order service's first-payment rule, never from here.
#[derive(Debug, Clone)]
pub struct CustomerService<S> {
    store: S,
}

impl<S: DocumentStore> CustomerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_customer(
        &self,
        ctx: &OwnerContext,
        new: NewCustomer,
    ) -> ServiceResult<Customer> {
        let owner = ctx.require_owner()?.clone();
        let now = Utc::now();
        let customer = Customer::create(CustomerId::new(), owner.clone(), new, now)?;
        self.store
            .put(Customer::COLLECTION, &customer.id().to_string(), to_doc(&customer)?)
            .await?;
        info!(owner = %owner, customer = %customer.id(), "customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, ctx: &OwnerContext, id: CustomerId) -> ServiceResult<Customer> {
        let owner = ctx.require_owner()?;
        load_active(&self.store, owner, &id, "customer").await
    }

    /// Live customers for the caller, newest first.
    pub async fn list_customers(&self, ctx: &OwnerContext) -> ServiceResult<Vec<Customer>> {
        let owner = ctx.require_owner()?;
        list_active(&self.store, owner).await
    }

    /// Soft delete. Orders that reference the customer keep the id; only
    /// reads stop returning the record.
    pub async fn delete_customer(&self, ctx: &OwnerContext, id: CustomerId) -> ServiceResult<()> {
        let owner = ctx.require_owner()?;
        let now = Utc::now();
        let customer: Customer = load_active(&self.store, owner, &id, "customer").await?;
        self.store
            .patch(
                Customer::COLLECTION,
                &id.to_string(),
                serde_json::json!({ "deleted_at": now, "updated_at": now }),
            )
            .await?;
        info!(owner = %owner, customer = %customer.id(), "customer deleted");
        Ok(())
    }
}
