//! Stock ledger: the only way a product's stock changes.
//!
//! Every operation validates its quantity before touching state, so a failed
//! call leaves the product untouched. Callers persist the product after each
//! successful call.

use stockflow_core::error::messages;
use stockflow_core::{DomainError, DomainResult, Rule};

use crate::product::Product;

fn ensure_non_negative(quantity: i64) -> DomainResult<()> {
    if quantity < 0 {
        return Err(Rule::NegativeQuantity.into());
    }
    Ok(())
}

impl Product {
    /// Increase stock by `quantity` (must be `>= 0`).
    pub fn add_stock(&mut self, quantity: i64) -> DomainResult<()> {
        ensure_non_negative(quantity)?;
        let stock = self
            .stock()
            .checked_add(quantity)
            .ok_or_else(|| DomainError::field("quantity", messages::TOO_LARGE))?;
        self.set_stock(stock);
        Ok(())
    }

    /// Decrease stock by `quantity` (must be `>= 0`). Stock never goes below zero.
    pub fn subtract_stock(&mut self, quantity: i64) -> DomainResult<()> {
        ensure_non_negative(quantity)?;
        if quantity > self.stock() {
            return Err(Rule::InsufficientStock.into());
        }
        self.set_stock(self.stock() - quantity);
        Ok(())
    }

    /// Whether `quantity` units can be taken out right now.
    ///
    /// Unavailable products are an error, not a `false`.
    pub fn can_supply(&self, quantity: i64) -> DomainResult<bool> {
        if !self.is_available() {
            return Err(Rule::ProductNotAvailable.into());
        }
        Ok(self.stock() >= quantity)
    }
}
