use serde::{Deserialize, Serialize};

use atelier_core::{DomainError, DomainResult};

/// Upper bound for any single monetary amount, in smallest currency unit
/// (e.g., cents). Applies to unit prices, costs, discounts and payments.
pub const MAX_AMOUNT: u64 = 100_000_000;

/// Upper bound for a per-line quantity.
pub const MAX_QUANTITY: u32 = 9_999;

/// One structured line of an order or quote.
///
/// Items are the source of truth for pricing; the human-readable summary
/// string is derived from them and never parsed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: u64, // Price in smallest currency unit (e.g., cents)
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: u64) -> DomainResult<Self> {
        let item = Self {
            name: name.into(),
            quantity,
            unit_price,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if self.quantity == 0 {
            return Err(DomainError::validation("item quantity must be at least 1"));
        }
        if self.quantity > MAX_QUANTITY {
            return Err(DomainError::validation(format!(
                "item quantity exceeds maximum ({MAX_QUANTITY})"
            )));
        }
        if self.unit_price > MAX_AMOUNT {
            return Err(DomainError::validation(format!(
                "item unit price exceeds maximum ({MAX_AMOUNT})"
            )));
        }
        Ok(())
    }

    /// `quantity * unit_price`, overflow-checked.
    pub fn subtotal(&self) -> DomainResult<u64> {
        u64::from(self.quantity)
            .checked_mul(self.unit_price)
            .ok_or_else(|| DomainError::invariant("line subtotal overflow"))
    }
}

/// Validate a full item list: non-empty, every line well-formed.
pub fn validate_items(items: &[LineItem]) -> DomainResult<()> {
    if items.is_empty() {
        return Err(DomainError::validation("at least one line item is required"));
    }
    for item in items {
        item.validate()?;
    }
    Ok(())
}

/// Sum of all line subtotals, overflow-checked.
pub fn items_total(items: &[LineItem]) -> DomainResult<u64> {
    let mut total: u64 = 0;
    for item in items {
        total = total
            .checked_add(item.subtotal()?)
            .ok_or_else(|| DomainError::invariant("items total overflow"))?;
    }
    Ok(total)
}

/// Human-readable join of item names, e.g. `"Camiseta (2x), Taza"`.
///
/// Lossy on purpose. Quantities of 1 carry no suffix and unit prices are not
/// encoded, so this string can never be parsed back into structured items.
pub fn product_summary(items: &[LineItem]) -> String {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity > 1 {
            parts.push(format!("{} ({}x)", item.name, item.quantity));
        } else {
            parts.push(item.name.clone());
        }
    }
    parts.join(", ")
}
