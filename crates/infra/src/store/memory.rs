use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockflow_core::{Entity, OrderDetailId, OrderId, ProductId};
use stockflow_orders::{DetailDraft, MovementType, Order, OrderDetail};
use stockflow_products::{NewProduct, Product};

use super::{InventoryStore, StoreError, StoreResult, StoreTx};

#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    details: BTreeMap<OrderDetailId, OrderDetail>,
    last_product_id: i64,
    last_order_id: i64,
    last_detail_id: i64,
}

impl Tables {
    fn duplicate_detail(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        skip: Option<OrderDetailId>,
    ) -> bool {
        self.details.values().any(|d| {
            Some(d.id()) != skip && d.order_id() == order_id && d.product_id() == product_id
        })
    }
}

/// In-memory store for tests and local development.
///
/// Transactions are fully serialized: `begin` holds the table lock until the
/// transaction is committed or dropped, and writes go to a private copy that
/// only replaces the shared tables on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(InMemoryTx { guard, work }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn insert_product(
        &mut self,
        new: &NewProduct,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        self.work.last_product_id += 1;
        let product = Product::create(ProductId::new(self.work.last_product_id), new.clone(), now);
        self.work.products.insert(product.id(), product.clone());
        Ok(product)
    }

    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn products(&mut self, available: Option<bool>) -> StoreResult<Vec<Product>> {
        Ok(self
            .work
            .products
            .values()
            .filter(|p| available.is_none_or(|a| p.is_available() == a))
            .cloned()
            .collect())
    }

    async fn products_by_ids(&mut self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        Ok(self
            .work
            .products
            .values()
            .filter(|p| ids.contains(&p.id()))
            .cloned()
            .collect())
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        // the whole store is already locked
        self.products_by_ids(ids).await
    }

    async fn update_product(&mut self, product: &Product) -> StoreResult<()> {
        match self.work.products.get_mut(&product.id()) {
            Some(slot) => {
                *slot = product.clone();
                Ok(())
            }
            None => Err(StoreError::MissingReference(format!("product {}", product.id()))),
        }
    }

    async fn delete_product(&mut self, id: ProductId) -> StoreResult<bool> {
        if self.work.details.values().any(|d| d.product_id() == id) {
            return Err(StoreError::ProtectedReference(format!(
                "product {id} is referenced by order details"
            )));
        }
        Ok(self.work.products.remove(&id).is_some())
    }

    async fn insert_order(
        &mut self,
        movement_type: MovementType,
        now: DateTime<Utc>,
    ) -> StoreResult<Order> {
        self.work.last_order_id += 1;
        let order = Order::create(OrderId::new(self.work.last_order_id), movement_type, now);
        self.work.orders.insert(order.id(), order.clone());
        Ok(order)
    }

    async fn order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.work.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        self.order(id).await
    }

    async fn orders(&mut self) -> StoreResult<Vec<Order>> {
        Ok(self.work.orders.values().cloned().collect())
    }

    async fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        match self.work.orders.get_mut(&order.id()) {
            Some(slot) => {
                *slot = order.clone();
                Ok(())
            }
            None => Err(StoreError::MissingReference(format!("order {}", order.id()))),
        }
    }

    async fn delete_order(&mut self, id: OrderId) -> StoreResult<bool> {
        if self.work.orders.remove(&id).is_none() {
            return Ok(false);
        }
        self.work.details.retain(|_, d| d.order_id() != id);
        Ok(true)
    }

    async fn insert_detail(
        &mut self,
        order_id: OrderId,
        draft: DetailDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<OrderDetail> {
        if !self.work.orders.contains_key(&order_id) {
            return Err(StoreError::MissingReference(format!("order {order_id}")));
        }
        if !self.work.products.contains_key(&draft.product_id) {
            return Err(StoreError::MissingReference(format!("product {}", draft.product_id)));
        }
        if self.work.duplicate_detail(order_id, draft.product_id, None) {
            return Err(StoreError::UniqueViolation(format!(
                "order {order_id} already has product {}",
                draft.product_id
            )));
        }

        self.work.last_detail_id += 1;
        let detail =
            OrderDetail::create(OrderDetailId::new(self.work.last_detail_id), order_id, draft, now);
        self.work.details.insert(detail.id(), detail.clone());
        Ok(detail)
    }

    async fn detail(&mut self, id: OrderDetailId) -> StoreResult<Option<OrderDetail>> {
        Ok(self.work.details.get(&id).cloned())
    }

    async fn details_for_order(&mut self, order_id: OrderId) -> StoreResult<Vec<OrderDetail>> {
        Ok(self
            .work
            .details
            .values()
            .filter(|d| d.order_id() == order_id)
            .cloned()
            .collect())
    }

    async fn update_detail(&mut self, detail: &OrderDetail) -> StoreResult<()> {
        if !self.work.products.contains_key(&detail.product_id()) {
            return Err(StoreError::MissingReference(format!(
                "product {}",
                detail.product_id()
            )));
        }
        if self
            .work
            .duplicate_detail(detail.order_id(), detail.product_id(), Some(detail.id()))
        {
            return Err(StoreError::UniqueViolation(format!(
                "order {} already has product {}",
                detail.order_id(),
                detail.product_id()
            )));
        }
        match self.work.details.get_mut(&detail.id()) {
            Some(slot) => {
                *slot = detail.clone();
                Ok(())
            }
            None => Err(StoreError::MissingReference(format!("order detail {}", detail.id()))),
        }
    }

    async fn delete_detail(&mut self, id: OrderDetailId) -> StoreResult<bool> {
        Ok(self.work.details.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use stockflow_core::Price;

    use super::*;

    fn widget(available: bool) -> NewProduct {
        NewProduct {
            name: "Widget".into(),
            price: Price::new(10.0).unwrap(),
            available,
        }
    }

    fn draft(product_id: ProductId, quantity: i64) -> DetailDraft {
        DetailDraft {
            product_id,
            quantity,
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_in_creation_order() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert_product(&widget(true), Utc::now()).await.unwrap();
        let b = tx.insert_product(&widget(false), Utc::now()).await.unwrap();
        assert!(a.id() < b.id());

        let listed = tx.products(None).await.unwrap();
        assert_eq!(listed.iter().map(Entity::id).collect::<Vec<_>>(), vec![a.id(), b.id()]);
        assert_eq!(tx.products(Some(false)).await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_product(&widget(true), Utc::now()).await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.products(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_transactions() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let p = tx.insert_product(&widget(true), Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.product(p.id()).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn details_are_unique_per_order_and_protect_products() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let p = tx.insert_product(&widget(true), Utc::now()).await.unwrap();
        let order = tx.insert_order(MovementType::Egress, Utc::now()).await.unwrap();

        tx.insert_detail(order.id(), draft(p.id(), 1), Utc::now()).await.unwrap();
        assert!(matches!(
            tx.insert_detail(order.id(), draft(p.id(), 2), Utc::now()).await,
            Err(StoreError::UniqueViolation(_))
        ));
        assert!(matches!(
            tx.delete_product(p.id()).await,
            Err(StoreError::ProtectedReference(_))
        ));

        assert!(tx.delete_order(order.id()).await.unwrap());
        assert!(tx.details_for_order(order.id()).await.unwrap().is_empty());
        assert!(tx.delete_product(p.id()).await.unwrap());
    }

    #[tokio::test]
    async fn details_reference_existing_rows() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_order(MovementType::Ingress, Utc::now()).await.unwrap();
        assert!(matches!(
            tx.insert_detail(order.id(), draft(ProductId::new(42), 1), Utc::now()).await,
            Err(StoreError::MissingReference(_))
        ));
    }
}
