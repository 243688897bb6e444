use chrono::{DateTime, Utc};
use serde::Serialize;

use stockflow_core::{Entity, Price, ProductId};

use crate::input::{NewProduct, ProductPatch};

/// Catalog entry with its stock level.
///
/// Stock is only changed through the ledger operations in [`crate::ledger`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    id: ProductId,
    name: String,
    price: Price,
    stock: i64,
    available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a freshly created product. Stock always starts at zero.
    pub fn create(id: ProductId, new: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            price: new.price,
            stock: 0,
            available: new.available,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a product from persisted state.
    pub fn restore(
        id: ProductId,
        name: String,
        price: Price,
        stock: i64,
        available: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            price,
            stock,
            available,
            created_at,
            updated_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply a validated catalog update. Stock is never part of a patch.
    pub fn apply_patch(&mut self, patch: ProductPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(available) = patch.available {
            self.available = available;
        }
        self.updated_at = now;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub(crate) fn set_stock(&mut self, stock: i64) {
        self.stock = stock;
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
