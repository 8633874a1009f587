use serde::{Deserialize, Serialize};

use atelier_core::{DomainError, DomainResult};

use crate::item::{LineItem, MAX_AMOUNT, items_total};

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// `value` is a whole percentage of the subtotal, 0..=100.
    Percentage,
    /// `value` is an absolute amount in smallest currency unit.
    Fixed,
}

/// Quote-level discount applied to the items subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    pub value: u64,
}

impl Discount {
    pub fn percentage(value: u64) -> DomainResult<Self> {
        let discount = Self {
            kind: DiscountKind::Percentage,
            value,
        };
        discount.validate()?;
        Ok(discount)
    }

    pub fn fixed(value: u64) -> DomainResult<Self> {
        let discount = Self {
            kind: DiscountKind::Fixed,
            value,
        };
        discount.validate()?;
        Ok(discount)
    }

    pub fn validate(&self) -> DomainResult<()> {
        match self.kind {
            DiscountKind::Percentage if self.value > 100 => Err(DomainError::validation(
                "percentage discount cannot exceed 100",
            )),
            DiscountKind::Fixed if self.value > MAX_AMOUNT => Err(DomainError::validation(
                format!("fixed discount exceeds maximum ({MAX_AMOUNT})"),
            )),
            _ => Ok(()),
        }
    }

    /// Apply the discount to a subtotal. Never goes below zero.
    pub fn apply(&self, subtotal: u64) -> u64 {
        match self.kind {
            DiscountKind::Percentage => {
                // u128 keeps the intermediate product exact for any u64 subtotal.
                let off = u128::from(subtotal) * u128::from(self.value.min(100)) / 100;
                subtotal - off as u64
            }
            DiscountKind::Fixed => subtotal.saturating_sub(self.value),
        }
    }
}

/// Items subtotal with an optional discount applied.
pub fn discounted_total(items: &[LineItem], discount: Option<&Discount>) -> DomainResult<u64> {
    let subtotal = items_total(items)?;
    Ok(match discount {
        Some(discount) => {
            discount.validate()?;
            discount.apply(subtotal)
        }
        None => subtotal,
    })
}
