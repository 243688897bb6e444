//! Application services: every operation the HTTP layer exposes.
//!
//! Each write runs in one store transaction. Lifecycle transitions lock the
//! order row and its products, run the pure transition, write every touched
//! row and commit; any error drops the transaction so nothing is applied.
//! Exchange rates are fetched only after the transaction has been released.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use stockflow_core::error::messages;
use stockflow_core::{
    DomainError, Entity, FieldErrors, OrderDetailId, OrderId, ProductId, Resource, Rule,
};
use stockflow_orders::validator::{
    validate_detail_removal, validate_detail_update, validate_new_detail,
};
use stockflow_orders::{
    DetailDraft, DetailInput, DetailPatch, Line, MovementType, NewOrder, Order, OrderDetail,
    OrderInput, OrderStatus,
};
use stockflow_pricing::{ExchangeRateProvider, RateError, total, usd_total};
use stockflow_products::{NewProduct, Product, ProductInput, ProductPatch};

use crate::store::{InventoryStore, StoreError, StoreTx};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Rate(#[from] RateError),
}

/// Constraint violations become the domain errors they stand for; everything
/// else stays a storage failure.
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(_) => Self::Domain(Rule::DuplicatedProduct.into()),
            StoreError::ProtectedReference(_) => Self::Domain(Rule::ProtectedProduct.into()),
            StoreError::MissingReference(_) => {
                Self::Domain(DomainError::field("product", messages::OBJECT_DOES_NOT_EXIST))
            }
            other => Self::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// An order detail with its product expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub id: OrderDetailId,
    pub product: Product,
    pub quantity: i64,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// An order as returned to callers, with server-computed totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub movement_type: MovementType,
    pub status: OrderStatus,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub details: Vec<DetailView>,
    pub total: f64,
    pub usd_total: f64,
}

/// Order state loaded inside a transaction, priced after it ends.
struct OrderSnapshot {
    order: Order,
    details: Vec<OrderDetail>,
    products: BTreeMap<ProductId, Product>,
}

impl OrderSnapshot {
    fn detail_views(&self) -> ServiceResult<Vec<DetailView>> {
        self.details
            .iter()
            .map(|d| detail_view(d, &self.products))
            .collect()
    }

    fn into_view(self, rate: f64) -> ServiceResult<OrderView> {
        let details = self.detail_views()?;
        let total = total(details.iter().map(|v| (v.quantity, v.product.price())));
        Ok(OrderView {
            id: self.order.id(),
            movement_type: self.order.movement_type(),
            status: self.order.status(),
            created_at: self.order.created_at(),
            updated_at: self.order.updated_at(),
            details,
            total,
            usd_total: usd_total(total, rate)?,
        })
    }
}

fn detail_view(
    detail: &OrderDetail,
    products: &BTreeMap<ProductId, Product>,
) -> ServiceResult<DetailView> {
    let product = products.get(&detail.product_id()).cloned().ok_or_else(|| {
        ServiceError::Store(StoreError::Backend(format!(
            "order detail {} references missing product {}",
            detail.id(),
            detail.product_id()
        )))
    })?;
    Ok(DetailView {
        id: detail.id(),
        product,
        quantity: detail.quantity(),
        created_at: detail.created_at(),
        updated_at: detail.updated_at(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Process,
    Cancel,
}

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
    rates: Arc<dyn ExchangeRateProvider>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn InventoryStore>, rates: Arc<dyn ExchangeRateProvider>) -> Self {
        Self { store, rates }
    }

    // ── products ────────────────────────────────────────────────────────────

    #[instrument(skip(self, input), err)]
    pub async fn create_product(&self, input: ProductInput) -> ServiceResult<Product> {
        let new = NewProduct::validate(input)?;
        let mut tx = self.store.begin().await?;
        let product = tx.insert_product(&new, Utc::now()).await?;
        tx.commit().await?;
        tracing::info!(product_id = %product.id(), "product created");
        Ok(product)
    }

    pub async fn list_products(&self, available: Option<bool>) -> ServiceResult<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.products(available).await?)
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        let mut tx = self.store.begin().await?;
        load_product(tx.as_mut(), id).await
    }

    /// Full replacement of name, price and availability.
    pub async fn replace_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> ServiceResult<Product> {
        let patch = ProductPatch::for_replace(input)?;
        self.apply_product_patch(id, patch).await
    }

    pub async fn patch_product(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> ServiceResult<Product> {
        let patch = ProductPatch::for_patch(input)?;
        self.apply_product_patch(id, patch).await
    }

    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    async fn apply_product_patch(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> ServiceResult<Product> {
        let mut tx = self.store.begin().await?;
        let mut product = load_product(tx.as_mut(), id).await?;
        product.apply_patch(patch, Utc::now());
        tx.update_product(&product).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Fails with the protected-product rule while any detail references it.
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete_product(&self, id: ProductId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_product(id).await? {
            return Err(DomainError::not_found(Resource::Product).into());
        }
        tx.commit().await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    // ── orders ──────────────────────────────────────────────────────────────

    /// Create a draft order and its inline details in one transaction.
    ///
    /// The exchange rate is fetched after commit, so a rate failure returns
    /// [`ServiceError::Rate`] even though the order has been stored.
    #[instrument(skip(self, input), err)]
    pub async fn create_order(&self, input: OrderInput) -> ServiceResult<OrderView> {
        let new = NewOrder::validate(input)?;
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut missing = FieldErrors::new();
        let mut products = BTreeMap::new();
        for (idx, draft) in new.details.iter().enumerate() {
            match tx.product(draft.product_id).await? {
                Some(p) => {
                    products.insert(p.id(), p);
                }
                None => missing.add(
                    format!("details[{idx}].product"),
                    messages::OBJECT_DOES_NOT_EXIST,
                ),
            }
        }
        missing.into_result()?;

        let order = tx.insert_order(new.movement_type, now).await?;
        let mut details: Vec<OrderDetail> = Vec::with_capacity(new.details.len());
        for draft in new.details {
            validate_new_detail(&order, &details, &draft)?;
            details.push(tx.insert_detail(order.id(), draft, now).await?);
        }
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id(),
            movement_type = %order.movement_type(),
            details = details.len(),
            "order created"
        );
        self.price(OrderSnapshot {
            order,
            details,
            products,
        })
        .await
    }

    pub async fn list_orders(&self) -> ServiceResult<Vec<OrderView>> {
        let snapshots = {
            let mut tx = self.store.begin().await?;
            let orders = tx.orders().await?;
            let mut snapshots = Vec::with_capacity(orders.len());
            for order in orders {
                snapshots.push(load_snapshot(tx.as_mut(), order).await?);
            }
            snapshots
        };

        if snapshots.is_empty() {
            return Ok(Vec::new());
        }
        let rate = self.rates.fetch_rate().await?;
        snapshots.into_iter().map(|s| s.into_view(rate)).collect()
    }

    pub async fn get_order(&self, id: OrderId) -> ServiceResult<OrderView> {
        let snapshot = {
            let mut tx = self.store.begin().await?;
            let order = load_order(tx.as_mut(), id).await?;
            load_snapshot(tx.as_mut(), order).await?
        };
        self.price(snapshot).await
    }

    /// Deletes the order and, by cascade, its details. Stock is not touched.
    #[instrument(skip(self), fields(order_id = %id), err)]
    pub async fn delete_order(&self, id: OrderId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_order(id).await? {
            return Err(DomainError::not_found(Resource::Order).into());
        }
        tx.commit().await?;
        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }

    /// Apply the order's stock movement and mark it processed.
    ///
    /// The rate is fetched after commit: a rate failure is reported as
    /// [`ServiceError::Rate`] while the stock movement stays applied.
    pub async fn process_order(&self, id: OrderId) -> ServiceResult<OrderView> {
        self.transition(id, Transition::Process).await
    }

    /// Cancel the order, reversing stock if it was processed.
    ///
    /// Same post-commit rate lookup as [`Self::process_order`].
    pub async fn cancel_order(&self, id: OrderId) -> ServiceResult<OrderView> {
        self.transition(id, Transition::Cancel).await
    }

    /// Locks the order and its products, commits, then prices the result.
    /// Pricing happens outside the transaction.
    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn transition(&self, id: OrderId, transition: Transition) -> ServiceResult<OrderView> {
        let snapshot = {
            let mut tx = self.store.begin().await?;
            let mut order = lock_order(tx.as_mut(), id).await?;
            let details = tx.details_for_order(id).await?;
            let ids: Vec<ProductId> = details.iter().map(OrderDetail::product_id).collect();
            let mut products = tx.lock_products(&ids).await?;

            let moves_stock = match transition {
                Transition::Process => true,
                Transition::Cancel => order.status() == OrderStatus::Processed,
            };

            {
                let mut by_id: BTreeMap<ProductId, &mut Product> =
                    products.iter_mut().map(|p| (p.id(), p)).collect();
                let mut lines = Vec::with_capacity(details.len());
                for detail in &details {
                    let product = by_id.remove(&detail.product_id()).ok_or_else(|| {
                        ServiceError::Store(StoreError::Backend(format!(
                            "order detail {} references missing product {}",
                            detail.id(),
                            detail.product_id()
                        )))
                    })?;
                    lines.push(Line { detail, product });
                }

                let now = Utc::now();
                let outcome = match transition {
                    Transition::Process => order.process(&mut lines, now),
                    Transition::Cancel => order.cancel(&mut lines, now),
                };
                if let Err(err) = outcome {
                    tracing::warn!(
                        order_id = %id,
                        transition = ?transition,
                        reason = %err,
                        "order transition rejected"
                    );
                    return Err(err.into());
                }
            }

            if moves_stock {
                for product in &products {
                    tx.update_product(product).await?;
                }
            }
            tx.update_order(&order).await?;
            tx.commit().await?;

            tracing::info!(
                order_id = %id,
                movement_type = %order.movement_type(),
                status = %order.status(),
                lines = details.len(),
                "order transition committed"
            );

            OrderSnapshot {
                order,
                details,
                products: products.into_iter().map(|p| (p.id(), p)).collect(),
            }
        };

        self.price(snapshot).await
    }

    // ── order details ───────────────────────────────────────────────────────

    pub async fn list_details(&self, order_id: OrderId) -> ServiceResult<Vec<DetailView>> {
        let mut tx = self.store.begin().await?;
        let order = load_order(tx.as_mut(), order_id).await?;
        load_snapshot(tx.as_mut(), order).await?.detail_views()
    }

    pub async fn get_detail(
        &self,
        order_id: OrderId,
        id: OrderDetailId,
    ) -> ServiceResult<DetailView> {
        let mut tx = self.store.begin().await?;
        load_order(tx.as_mut(), order_id).await?;
        let detail = load_detail(tx.as_mut(), order_id, id).await?;
        let product = load_product(tx.as_mut(), detail.product_id()).await?;
        detail_view(&detail, &BTreeMap::from([(product.id(), product)]))
    }

    #[instrument(skip(self, input), fields(order_id = %order_id), err)]
    pub async fn create_detail(
        &self,
        order_id: OrderId,
        input: DetailInput,
    ) -> ServiceResult<DetailView> {
        let draft = DetailDraft::validate(input)?;
        let mut tx = self.store.begin().await?;
        let order = lock_order(tx.as_mut(), order_id).await?;
        let product = load_referenced_product(tx.as_mut(), draft.product_id).await?;
        let siblings = tx.details_for_order(order_id).await?;

        validate_new_detail(&order, &siblings, &draft)?;
        let detail = tx.insert_detail(order_id, draft, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order_id, detail_id = %detail.id(), "order detail created");
        detail_view(&detail, &BTreeMap::from([(product.id(), product)]))
    }

    /// Full replacement: product and quantity are both required.
    pub async fn replace_detail(
        &self,
        order_id: OrderId,
        id: OrderDetailId,
        input: DetailInput,
    ) -> ServiceResult<DetailView> {
        let draft = DetailDraft::validate(input)?;
        self.update_detail(order_id, id, |_| draft).await
    }

    pub async fn patch_detail(
        &self,
        order_id: OrderId,
        id: OrderDetailId,
        input: DetailInput,
    ) -> ServiceResult<DetailView> {
        let patch = DetailPatch::validate(input)?;
        self.update_detail(order_id, id, |current| current.merged(&patch)).await
    }

    #[instrument(skip(self, make_draft), fields(order_id = %order_id, detail_id = %id), err)]
    async fn update_detail<F>(
        &self,
        order_id: OrderId,
        id: OrderDetailId,
        make_draft: F,
    ) -> ServiceResult<DetailView>
    where
        F: FnOnce(&OrderDetail) -> DetailDraft + Send,
    {
        let mut tx = self.store.begin().await?;
        let order = lock_order(tx.as_mut(), order_id).await?;
        let mut detail = load_detail(tx.as_mut(), order_id, id).await?;
        let draft = make_draft(&detail);
        let product = load_referenced_product(tx.as_mut(), draft.product_id).await?;
        let siblings = tx.details_for_order(order_id).await?;

        validate_detail_update(&order, &siblings, &detail, &draft)?;
        detail.apply(draft, Utc::now());
        tx.update_detail(&detail).await?;
        tx.commit().await?;

        detail_view(&detail, &BTreeMap::from([(product.id(), product)]))
    }

    #[instrument(skip(self), fields(order_id = %order_id, detail_id = %id), err)]
    pub async fn delete_detail(&self, order_id: OrderId, id: OrderDetailId) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        let order = lock_order(tx.as_mut(), order_id).await?;
        let detail = load_detail(tx.as_mut(), order_id, id).await?;
        validate_detail_removal(&order, &detail)?;
        tx.delete_detail(id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn price(&self, snapshot: OrderSnapshot) -> ServiceResult<OrderView> {
        let rate = self.rates.fetch_rate().await?;
        snapshot.into_view(rate)
    }
}

async fn load_product(tx: &mut dyn StoreTx, id: ProductId) -> ServiceResult<Product> {
    tx.product(id)
        .await?
        .ok_or_else(|| DomainError::not_found(Resource::Product).into())
}

/// A product named in a request body: missing is a field error, not a 404.
async fn load_referenced_product(tx: &mut dyn StoreTx, id: ProductId) -> ServiceResult<Product> {
    tx.product(id)
        .await?
        .ok_or_else(|| DomainError::field("product", messages::OBJECT_DOES_NOT_EXIST).into())
}

async fn load_order(tx: &mut dyn StoreTx, id: OrderId) -> ServiceResult<Order> {
    tx.order(id)
        .await?
        .ok_or_else(|| DomainError::not_found(Resource::Order).into())
}

/// Row-locks the order until the tx ends; writes that depend on its status use this.
async fn lock_order(tx: &mut dyn StoreTx, id: OrderId) -> ServiceResult<Order> {
    tx.lock_order(id)
        .await?
        .ok_or_else(|| DomainError::not_found(Resource::Order).into())
}

/// A detail only exists under the order it belongs to.
async fn load_detail(
    tx: &mut dyn StoreTx,
    order_id: OrderId,
    id: OrderDetailId,
) -> ServiceResult<OrderDetail> {
    tx.detail(id)
        .await?
        .filter(|d| d.order_id() == order_id)
        .ok_or_else(|| DomainError::not_found(Resource::OrderDetail).into())
}

async fn load_snapshot(tx: &mut dyn StoreTx, order: Order) -> ServiceResult<OrderSnapshot> {
    let details = tx.details_for_order(order.id()).await?;
    let ids: Vec<ProductId> = details.iter().map(OrderDetail::product_id).collect();
    let products = tx
        .products_by_ids(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id(), p))
        .collect();
    Ok(OrderSnapshot {
        order,
        details,
        products,
    })
}

#[cfg(test)]
mod tests {
    use stockflow_pricing::FixedRate;

    use super::*;
    use crate::store::InMemoryStore;

    fn service(rate: f64) -> InventoryService {
        InventoryService::new(Arc::new(InMemoryStore::new()), Arc::new(FixedRate(rate)))
    }

    async fn product(svc: &InventoryService, price: f64, available: bool) -> Product {
        svc.create_product(ProductInput {
            name: Some(format!("Product {price}")),
            price: Some(price),
            available: Some(available),
        })
        .await
        .unwrap()
    }

    async fn stock_up(svc: &InventoryService, product: &Product, quantity: i64) {
        let order = svc
            .create_order(order_input(Some("INGRESS"), &[(product.id(), quantity)]))
            .await
            .unwrap();
        svc.process_order(order.id).await.unwrap();
    }

    fn order_input(movement: Option<&str>, lines: &[(ProductId, i64)]) -> OrderInput {
        OrderInput {
            movement_type: movement.map(str::to_string),
            details: Some(
                lines
                    .iter()
                    .map(|(p, q)| DetailInput {
                        product: Some(p.get()),
                        quantity: Some(*q),
                    })
                    .collect(),
            ),
        }
    }

    fn rule(err: ServiceError) -> Option<Rule> {
        match err {
            ServiceError::Domain(e) => e.rule(),
            _ => None,
        }
    }

    #[tokio::test]
    async fn egress_round_trip_restores_stock() {
        let svc = service(1.0);
        let p = product(&svc, 100.0, true).await;
        stock_up(&svc, &p, 3).await;

        let order = svc
            .create_order(order_input(None, &[(p.id(), 1)]))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Draft);
        assert_eq!(order.movement_type, MovementType::Egress);
        assert_eq!(order.total, 100.0);

        let processed = svc.process_order(order.id).await.unwrap();
        assert_eq!(processed.status, OrderStatus::Processed);
        assert_eq!(svc.get_product(p.id()).await.unwrap().stock(), 2);

        let cancelled = svc.cancel_order(order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(svc.get_product(p.id()).await.unwrap().stock(), 3);

        let err = svc.cancel_order(order.id).await.unwrap_err();
        assert_eq!(rule(err), Some(Rule::AlreadyCancelled));
    }

    #[tokio::test]
    async fn failed_process_commits_nothing() {
        let svc = service(1.0);
        let p1 = product(&svc, 10.0, true).await;
        let p2 = product(&svc, 20.0, true).await;
        stock_up(&svc, &p1, 5).await;
        stock_up(&svc, &p2, 1).await;

        let order = svc
            .create_order(order_input(Some("EGRESS"), &[(p1.id(), 2), (p2.id(), 4)]))
            .await
            .unwrap();
        let err = svc.process_order(order.id).await.unwrap_err();
        assert_eq!(rule(err), Some(Rule::StockAvailability));

        assert_eq!(svc.get_product(p1.id()).await.unwrap().stock(), 5);
        assert_eq!(svc.get_product(p2.id()).await.unwrap().stock(), 1);
        assert_eq!(svc.get_order(order.id).await.unwrap().status, OrderStatus::Draft);
    }

    #[tokio::test]
    async fn cancelling_processed_ingress_checks_stock() {
        let svc = service(1.0);
        let p = product(&svc, 10.0, true).await;

        let ingress = svc
            .create_order(order_input(Some("INGRESS"), &[(p.id(), 5)]))
            .await
            .unwrap();
        svc.process_order(ingress.id).await.unwrap();

        let egress = svc
            .create_order(order_input(Some("EGRESS"), &[(p.id(), 4)]))
            .await
            .unwrap();
        svc.process_order(egress.id).await.unwrap();

        let err = svc.cancel_order(ingress.id).await.unwrap_err();
        assert_eq!(rule(err), Some(Rule::CancelStockAvailability));
        assert_eq!(svc.get_product(p.id()).await.unwrap().stock(), 1);
        assert_eq!(svc.get_order(ingress.id).await.unwrap().status, OrderStatus::Processed);
    }

    #[tokio::test]
    async fn details_are_frozen_after_processing() {
        let svc = service(1.0);
        let p1 = product(&svc, 10.0, true).await;
        let p2 = product(&svc, 10.0, true).await;
        let order = svc
            .create_order(order_input(Some("INGRESS"), &[(p1.id(), 1)]))
            .await
            .unwrap();
        svc.process_order(order.id).await.unwrap();

        let err = svc
            .create_detail(
                order.id,
                DetailInput {
                    product: Some(p2.id().get()),
                    quantity: Some(1),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(rule(err), Some(Rule::NotEditableOrder));

        let detail_id = order.details[0].id;
        let err = svc
            .replace_detail(
                order.id,
                detail_id,
                DetailInput {
                    product: Some(p1.id().get()),
                    quantity: Some(3),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(rule(err), Some(Rule::NotEditableOrder));

        let err = svc.delete_detail(order.id, detail_id).await.unwrap_err();
        assert_eq!(rule(err), Some(Rule::NotEditableOrder));
        assert_eq!(svc.list_details(order.id).await.unwrap()[0].quantity, 1);
    }

    #[tokio::test]
    async fn duplicate_products_are_rejected_on_create_and_update() {
        let svc = service(1.0);
        let p1 = product(&svc, 10.0, true).await;
        let p2 = product(&svc, 10.0, true).await;
        let order = svc
            .create_order(order_input(None, &[(p1.id(), 1), (p2.id(), 1)]))
            .await
            .unwrap();

        let err = svc
            .create_detail(
                order.id,
                DetailInput {
                    product: Some(p1.id().get()),
                    quantity: Some(3),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(rule(err), Some(Rule::DuplicatedProduct));

        let second = order.details[1].id;
        let err = svc
            .patch_detail(
                order.id,
                second,
                DetailInput {
                    product: Some(p1.id().get()),
                    quantity: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(rule(err), Some(Rule::DuplicatedProduct));

        let updated = svc
            .patch_detail(
                order.id,
                second,
                DetailInput {
                    product: None,
                    quantity: Some(7),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.quantity, 7);
    }

    #[tokio::test]
    async fn referenced_products_cannot_be_deleted_until_the_order_is() {
        let svc = service(1.0);
        let p = product(&svc, 10.0, true).await;
        let order = svc
            .create_order(order_input(None, &[(p.id(), 1)]))
            .await
            .unwrap();

        let err = svc.delete_product(p.id()).await.unwrap_err();
        assert_eq!(rule(err), Some(Rule::ProtectedProduct));

        svc.delete_order(order.id).await.unwrap();
        assert!(matches!(
            svc.list_details(order.id).await,
            Err(ServiceError::Domain(DomainError::NotFound(Resource::Order)))
        ));
        svc.delete_product(p.id()).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_products_in_details_are_field_errors() {
        let svc = service(1.0);
        let err = svc
            .create_order(order_input(None, &[(ProductId::new(99), 1)]))
            .await
            .unwrap_err();
        match err {
            ServiceError::Domain(DomainError::Validation(fields)) => {
                assert_eq!(
                    fields.get("details[0].product").unwrap(),
                    [messages::OBJECT_DOES_NOT_EXIST]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn totals_are_converted_with_the_rate() {
        let svc = service(2.0);
        let p = product(&svc, 100.0, true).await;
        let order = svc
            .create_order(order_input(None, &[(p.id(), 5)]))
            .await
            .unwrap();
        assert_eq!(order.total, 500.0);
        assert_eq!(order.usd_total, 250.0);

        let stored = svc.get_order(order.id).await.unwrap();
        assert_eq!((stored.total, stored.usd_total), (500.0, 250.0));
    }

    struct RateDown;

    #[async_trait::async_trait]
    impl ExchangeRateProvider for RateDown {
        async fn fetch_rate(&self) -> Result<f64, RateError> {
            Err(RateError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn rate_failures_are_reported_after_the_write_is_committed() {
        let store = InMemoryStore::new();
        let healthy = InventoryService::new(Arc::new(store.clone()), Arc::new(FixedRate(1.0)));
        let degraded = InventoryService::new(Arc::new(store), Arc::new(RateDown));
        let p = product(&healthy, 10.0, true).await;

        let err = degraded
            .create_order(order_input(Some("INGRESS"), &[(p.id(), 4)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Rate(RateError::Unavailable(_))));

        let orders = healthy.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        let order_id = orders[0].id;

        let err = degraded.process_order(order_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Rate(_)));
        assert_eq!(healthy.get_product(p.id()).await.unwrap().stock(), 4);
        assert_eq!(
            healthy.get_order(order_id).await.unwrap().status,
            OrderStatus::Processed
        );
    }

    #[tokio::test]
    async fn product_listing_filters_by_availability() {
        let svc = service(1.0);
        let a = product(&svc, 1.0, true).await;
        let b = product(&svc, 2.0, false).await;

        let all = svc.list_products(None).await.unwrap();
        assert_eq!(all.iter().map(|p| p.id()).collect::<Vec<_>>(), vec![a.id(), b.id()]);
        assert_eq!(svc.list_products(Some(false)).await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn missing_orders_are_not_found() {
        let svc = service(1.0);
        for result in [
            svc.process_order(OrderId::new(7)).await,
            svc.cancel_order(OrderId::new(7)).await,
            svc.get_order(OrderId::new(7)).await,
        ] {
            assert!(matches!(
                result,
                Err(ServiceError::Domain(DomainError::NotFound(Resource::Order)))
            ));
        }
    }

    #[tokio::test]
    async fn detail_writes_on_missing_orders_are_not_found() {
        let svc = service(1.0);
        let p = product(&svc, 1.0, true).await;
        let order = svc
            .create_order(order_input(Some("INGRESS"), &[(p.id(), 1)]))
            .await
            .unwrap();
        let detail_id = order.details[0].id;
        let missing = OrderId::new(order.id.get() + 1);
        let input = || DetailInput {
            product: Some(p.id().get()),
            quantity: Some(2),
        };

        let results = [
            svc.create_detail(missing, input()).await.map(drop),
            svc.replace_detail(missing, detail_id, input()).await.map(drop),
            svc.patch_detail(missing, detail_id, input()).await.map(drop),
            svc.delete_detail(missing, detail_id).await,
        ];
        for result in results {
            assert!(matches!(
                result,
                Err(ServiceError::Domain(DomainError::NotFound(Resource::Order)))
            ));
        }
    }
}
