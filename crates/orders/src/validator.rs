//! Detail validator.
//!
//! Decides whether a proposed detail (new or replacing an existing one) is
//! acceptable given the owning order and its sibling details. The caller loads
//! both and passes them in explicitly.

use stockflow_core::error::messages;
use stockflow_core::{DomainError, DomainResult, Entity, OrderDetailId, ProductId, Resource, Rule};

use crate::detail::{DetailDraft, OrderDetail};
use crate::order::Order;

/// Detail quantities must be strictly positive.
pub fn validate_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::field("quantity", messages::GREATER_ZERO));
    }
    Ok(())
}

/// Details of a non-draft order are frozen.
pub fn check_editable(order: &Order) -> DomainResult<()> {
    order.ensure_editable()
}

/// A product appears at most once per order. `exclude` skips the detail being replaced.
pub fn check_duplicate(
    siblings: &[OrderDetail],
    product_id: ProductId,
    exclude: Option<OrderDetailId>,
) -> DomainResult<()> {
    let duplicated = siblings
        .iter()
        .filter(|d| Some(d.id()) != exclude)
        .any(|d| d.product_id() == product_id);
    if duplicated {
        return Err(Rule::DuplicatedProduct.into());
    }
    Ok(())
}

/// Validate adding `draft` to `order`.
pub fn validate_new_detail(
    order: &Order,
    siblings: &[OrderDetail],
    draft: &DetailDraft,
) -> DomainResult<()> {
    check_editable(order)?;
    validate_quantity(draft.quantity)?;
    check_duplicate(siblings, draft.product_id, None)
}

/// Validate replacing `detail` with `draft`.
pub fn validate_detail_update(
    order: &Order,
    siblings: &[OrderDetail],
    detail: &OrderDetail,
    draft: &DetailDraft,
) -> DomainResult<()> {
    if detail.order_id() != order.id() {
        return Err(DomainError::not_found(Resource::OrderDetail));
    }
    check_editable(order)?;
    validate_quantity(draft.quantity)?;
    check_duplicate(siblings, draft.product_id, Some(detail.id()))
}

/// Deleting a detail is a change to the order, so it needs a draft order too.
pub fn validate_detail_removal(order: &Order, detail: &OrderDetail) -> DomainResult<()> {
    if detail.order_id() != order.id() {
        return Err(DomainError::not_found(Resource::OrderDetail));
    }
    check_editable(order)
}
