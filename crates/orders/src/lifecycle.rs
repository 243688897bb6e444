//! Order lifecycle: `process` and `cancel` transitions and the stock effect
//! each one has on the order's products.
//!
//! The transitions here work on already-loaded state. They check every line
//! before mutating any product, so an error leaves all products and the order
//! untouched. Persisting the result in one transaction is the caller's job.

use chrono::{DateTime, Utc};

use stockflow_core::error::messages;
use stockflow_core::{DomainError, DomainResult, Rule};
use stockflow_products::Product;

use crate::detail::OrderDetail;
use crate::order::{MovementType, Order, OrderStatus};

/// What a transition does to one product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// Put `quantity` back on the shelf.
    Add,
    /// Take `quantity` out. `shortage` is reported when stock is too low.
    Subtract { shortage: Rule },
}

impl StockEffect {
    /// Effect of processing an order of this movement type.
    pub fn for_process(movement: MovementType) -> Self {
        match movement {
            MovementType::Ingress => StockEffect::Add,
            MovementType::Egress => StockEffect::Subtract {
                shortage: Rule::StockAvailability,
            },
        }
    }

    /// Effect of cancelling a processed order: the inverse of processing.
    pub fn for_reversal(movement: MovementType) -> Self {
        match movement {
            MovementType::Ingress => StockEffect::Subtract {
                shortage: Rule::CancelStockAvailability,
            },
            MovementType::Egress => StockEffect::Add,
        }
    }

    /// Whether the effect can be applied, without applying it.
    pub fn check(self, product: &Product, quantity: i64) -> DomainResult<()> {
        match self {
            StockEffect::Add => match product.stock().checked_add(quantity) {
                Some(_) => Ok(()),
                None => Err(DomainError::field("quantity", messages::TOO_LARGE)),
            },
            StockEffect::Subtract { shortage } => {
                if !product.can_supply(quantity)? {
                    return Err(shortage.into());
                }
                Ok(())
            }
        }
    }

    pub fn apply(self, product: &mut Product, quantity: i64) -> DomainResult<()> {
        self.check(product, quantity)?;
        match self {
            StockEffect::Add => product.add_stock(quantity),
            StockEffect::Subtract { .. } => product.subtract_stock(quantity),
        }
    }
}

/// A detail paired with the product it references.
#[derive(Debug)]
pub struct Line<'a> {
    pub detail: &'a OrderDetail,
    pub product: &'a mut Product,
}

fn run(effect: StockEffect, lines: &mut [Line<'_>], now: DateTime<Utc>) -> DomainResult<()> {
    for line in lines.iter() {
        effect.check(&*line.product, line.detail.quantity())?;
    }
    for line in lines.iter_mut() {
        effect.apply(line.product, line.detail.quantity())?;
        line.product.touch(now);
    }
    Ok(())
}

impl Order {
    /// `Draft -> Processed`, moving stock for every line.
    pub fn process(&mut self, lines: &mut [Line<'_>], now: DateTime<Utc>) -> DomainResult<()> {
        if self.status() != OrderStatus::Draft {
            return Err(Rule::NotEditableOrder.into());
        }
        run(StockEffect::for_process(self.movement_type()), lines, now)?;
        self.set_status(OrderStatus::Processed, now);
        Ok(())
    }

    /// `Draft | Processed -> Cancelled`. Only a processed order has stock to reverse.
    pub fn cancel(&mut self, lines: &mut [Line<'_>], now: DateTime<Utc>) -> DomainResult<()> {
        match self.status() {
            OrderStatus::Cancelled => return Err(Rule::AlreadyCancelled.into()),
            OrderStatus::Processed => {
                run(StockEffect::for_reversal(self.movement_type()), lines, now)?
            }
            OrderStatus::Draft => {}
        }
        self.set_status(OrderStatus::Cancelled, now);
        Ok(())
    }
}
