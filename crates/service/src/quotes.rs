//! Quote operations, including the one-way approval into an order.

use atelier_catalog::validate_items;
use atelier_core::{OrderId, QuoteId, Record};
use atelier_numbering::SequenceKind;
use atelier_orders::{NewOrder, Order};
use atelier_quotes::{NewQuote, Quote, QuotePatch, QuoteStatus};
use atelier_store::DocumentStore;
use chrono::{Datelike, Utc};
use tracing::{info, warn};

use crate::allocator::SequenceAllocator;
use crate::context::OwnerContext;
use crate::documents::{from_doc, list_active, load_active, to_doc};
use crate::error::{ServiceError, ServiceResult};

/// Quote lifecycle operations over one storage backend.
#[derive(Debug, Clone)]
pub struct QuoteService<S> {
    store: S,
    allocator: SequenceAllocator<S>,
}

impl<S: DocumentStore + Clone> QuoteService<S> {
    pub fn new(store: S) -> Self {
        Self {
            allocator: SequenceAllocator::new(store.clone()),
            store,
        }
    }

    /// Create a draft quote under a freshly allocated `ORC-` number.
    pub async fn create_quote(&self, ctx: &OwnerContext, new: NewQuote) -> ServiceResult<Quote> {
        let owner = ctx.require_owner()?.clone();
        let now = Utc::now();

        // Validate before allocating so bad input does not consume a number.
        validate_items(&new.items)?;
        if let Some(discount) = &new.discount {
            discount.validate()?;
        }

        let number = self
            .allocator
            .allocate(&owner, SequenceKind::Quotes, now.year())
            .await?;
        let quote = Quote::create(QuoteId::new(), owner.clone(), number, new, now)?;
        self.store
            .put(Quote::COLLECTION, &quote.id().to_string(), to_doc(&quote)?)
            .await?;
        info!(owner = %owner, number = quote.number(), "quote created");
        Ok(quote)
    }

    pub async fn get_quote(&self, ctx: &OwnerContext, id: QuoteId) -> ServiceResult<Quote> {
        let owner = ctx.require_owner()?;
        load_active(&self.store, owner, &id, "quote").await
    }

    /// Live quotes for the caller, newest first.
    pub async fn list_quotes(&self, ctx: &OwnerContext) -> ServiceResult<Vec<Quote>> {
        let owner = ctx.require_owner()?;
        list_active(&self.store, owner).await
    }

    /// Apply a partial update. Approved quotes reject every patch.
    pub async fn update_quote(
        &self,
        ctx: &OwnerContext,
        id: QuoteId,
        patch: QuotePatch,
    ) -> ServiceResult<Quote> {
        let owner = ctx.require_owner()?;
        let now = Utc::now();
        let mut quote: Quote = load_active(&self.store, owner, &id, "quote").await?;
        quote.apply_patch(patch, now)?;
        self.store
            .put(Quote::COLLECTION, &id.to_string(), to_doc(&quote)?)
            .await?;
        Ok(quote)
    }

    /// Soft delete. Approved quotes keep their order links in storage.
    pub async fn delete_quote(&self, ctx: &OwnerContext, id: QuoteId) -> ServiceResult<()> {
        let owner = ctx.require_owner()?;
        let now = Utc::now();
        let quote: Quote = load_active(&self.store, owner, &id, "quote").await?;
        self.store
            .patch(
                Quote::COLLECTION,
                &id.to_string(),
                serde_json::json!({ "deleted_at": now, "updated_at": now }),
            )
            .await?;
        info!(owner = %owner, number = quote.number(), "quote deleted");
        Ok(())
    }

    /// Turn an accepted quote into an order, one way.
    ///
    /// The order takes the quote's items, discounted total and delivery
    /// date, gets its notes tagged with the quote number, and records the
    /// quote as its source. The quote is then marked approved and linked
    /// back. Two writes cannot be atomic here, so the failure mode after the
    /// order write is explicit: [`ServiceError::QuoteApprovalIncomplete`],
    /// and calling approve again resumes with the already-created order
    /// (found by its `source_quote_id`) instead of minting a second one.
    pub async fn approve_quote(
        &self,
        ctx: &OwnerContext,
        quote_id: QuoteId,
    ) -> ServiceResult<(Order, Quote)> {
        let owner = ctx.require_owner()?.clone();
        let now = Utc::now();
        let mut quote: Quote = load_active(&self.store, &owner, &quote_id, "quote").await?;

        if quote.status() == QuoteStatus::Approved {
            return Err(ServiceError::Conflict("quote is already approved".to_string()));
        }
        let Some(delivery_date) = quote.delivery_date() else {
            return Err(ServiceError::Validation(
                "quote needs a delivery date before approval".to_string(),
            ));
        };

        // Resume path: a previous attempt may have written the order and
        // then failed to mark the quote approved.
        let existing = self
            .store
            .query(
                Order::COLLECTION,
                &[("source_quote_id", to_doc(&quote_id)?)],
                None,
            )
            .await?;

        let order: Order = match existing.into_iter().next() {
            Some(doc) => from_doc(doc)?,
            None => {
                let number = self
                    .allocator
                    .allocate(&owner, SequenceKind::Orders, now.year())
                    .await?;
                let mut new = NewOrder::new(quote.items().to_vec(), delivery_date);
                new.customer_id = quote.customer_id();
                new.price = Some(quote.total());
                new.notes = Some(match quote.notes() {
                    Some(notes) => format!("{notes}\nCreated from quote {}", quote.number()),
                    None => format!("Created from quote {}", quote.number()),
                });
                new.source_quote_id = Some(quote_id);
                let order = Order::create(OrderId::new(), owner.clone(), number, new, now)?;
                self.store
                    .put(Order::COLLECTION, &order.id().to_string(), to_doc(&order)?)
                    .await?;
                order
            }
        };

        quote.approve(*order.id(), order.number(), now)?;
        let link = serde_json::json!({
            "status": QuoteStatus::Approved,
            "linked_order_id": order.id(),
            "linked_order_number": order.number(),
            "updated_at": now,
        });
        if let Err(err) = self.store.patch(Quote::COLLECTION, &quote_id.to_string(), link).await {
            warn!(
                quote = %quote_id,
                order = %order.id(),
                error = %err,
                "order written but quote not marked approved"
            );
            return Err(ServiceError::QuoteApprovalIncomplete {
                quote_id,
                order_id: *order.id(),
                reason: err.to_string(),
            });
        }

        info!(owner = %owner, quote = quote.number(), order = order.number(), "quote approved");
        Ok((order, quote))
    }
}
