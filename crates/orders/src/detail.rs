use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::error::messages;
use stockflow_core::{DomainResult, Entity, FieldErrors, OrderDetailId, OrderId, ProductId};

use crate::validator::validate_quantity;

/// One line of an order: a product and a strictly positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    id: OrderDetailId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderDetail {
    pub fn create(
        id: OrderDetailId,
        order_id: OrderId,
        draft: DetailDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            product_id: draft.product_id,
            quantity: draft.quantity,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn restore(
        id: OrderDetailId,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            product_id,
            quantity,
            created_at,
            updated_at,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The draft this detail would become after applying `patch`.
    pub fn merged(&self, patch: &DetailPatch) -> DetailDraft {
        DetailDraft {
            product_id: patch.product_id.unwrap_or(self.product_id),
            quantity: patch.quantity.unwrap_or(self.quantity),
        }
    }

    /// Overwrite product and quantity. The owning order never changes.
    pub fn apply(&mut self, draft: DetailDraft, now: DateTime<Utc>) {
        self.product_id = draft.product_id;
        self.quantity = draft.quantity;
        self.updated_at = now;
    }
}

impl Entity for OrderDetail {
    type Id = OrderDetailId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Raw detail fields as received from a caller.
///
/// `order` is deliberately absent: nested routes fix it from the URL.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DetailInput {
    pub product: Option<i64>,
    pub quantity: Option<i64>,
}

/// Validated product and quantity for a new or replaced detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailDraft {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Validated partial update of a detail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailPatch {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
}

impl DetailDraft {
    /// `product` and `quantity` are both required; quantity must be `> 0`.
    pub fn validate(input: DetailInput) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();
        if input.product.is_none() {
            errors.add("product", messages::REQUIRED);
        }
        if input.quantity.is_none() {
            errors.add("quantity", messages::REQUIRED);
        }
        let patch = collect(input, &mut errors);
        errors.into_result()?;

        match (patch.product_id, patch.quantity) {
            (Some(product_id), Some(quantity)) => Ok(Self {
                product_id,
                quantity,
            }),
            _ => {
                let mut errors = FieldErrors::new();
                errors.add("product", messages::REQUIRED);
                Err(errors.into())
            }
        }
    }
}

impl DetailPatch {
    pub fn validate(input: DetailInput) -> DomainResult<Self> {
        let mut errors = FieldErrors::new();
        let patch = collect(input, &mut errors);
        errors.into_result()?;
        Ok(patch)
    }
}

fn collect(input: DetailInput, errors: &mut FieldErrors) -> DetailPatch {
    let product_id = input.product.and_then(|raw| {
        if raw <= 0 {
            errors.add("product", messages::OBJECT_DOES_NOT_EXIST);
            None
        } else {
            Some(ProductId::new(raw))
        }
    });

    let quantity = input.quantity.and_then(|q| match validate_quantity(q) {
        Ok(()) => Some(q),
        Err(_) => {
            errors.add("quantity", messages::GREATER_ZERO);
            None
        }
    });

    DetailPatch {
        product_id,
        quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::DomainError;

    fn fields(err: DomainError) -> FieldErrors {
        match err {
            DomainError::Validation(f) => f,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn draft_requires_product_and_quantity() {
        let errors = fields(DetailDraft::validate(DetailInput::default()).unwrap_err());
        assert_eq!(errors.get("product").unwrap(), [messages::REQUIRED]);
        assert_eq!(errors.get("quantity").unwrap(), [messages::REQUIRED]);
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        for q in [0, -5] {
            let errors = fields(
                DetailDraft::validate(DetailInput {
                    product: Some(1),
                    quantity: Some(q),
                })
                .unwrap_err(),
            );
            assert_eq!(errors.get("quantity").unwrap(), [messages::GREATER_ZERO]);
        }
    }

    #[test]
    fn patch_merges_over_existing_detail() {
        let detail = OrderDetail::create(
            OrderDetailId::new(1),
            OrderId::new(1),
            DetailDraft {
                product_id: ProductId::new(3),
                quantity: 2,
            },
            Utc::now(),
        );
        let patch = DetailPatch::validate(DetailInput {
            product: None,
            quantity: Some(9),
        })
        .unwrap();

        let merged = detail.merged(&patch);
        assert_eq!(merged.product_id, ProductId::new(3));
        assert_eq!(merged.quantity, 9);
    }
}
