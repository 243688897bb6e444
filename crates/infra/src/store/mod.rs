//! Persistence interface for products, orders and order details.
//!
//! All access goes through a transaction obtained from [`InventoryStore::begin`].
//! Dropping a [`StoreTx`] without calling [`StoreTx::commit`] discards every
//! write made through it.
//!
//! Backends must enforce:
//! - `(order_id, product_id)` uniqueness on details ([`StoreError::UniqueViolation`])
//! - protect-on-delete from details to products ([`StoreError::ProtectedReference`])
//! - cascade delete from orders to their details
//! - details listed per order in id order

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use stockflow_core::{OrderDetailId, OrderId, ProductId};
use stockflow_orders::{DetailDraft, MovementType, Order, OrderDetail};
use stockflow_products::{NewProduct, Product};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The row is still referenced and cannot be deleted.
    #[error("row is still referenced: {0}")]
    ProtectedReference(String),

    /// The write points at a row that does not exist.
    #[error("referenced row does not exist: {0}")]
    MissingReference(String),

    /// Anything else the backend reported.
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Opens transactions against the backing store.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

/// One unit of work. Ids are assigned by the store on insert.
///
/// `lock_*` reads take row locks (where the backend has them) that are held
/// until the transaction ends.
#[async_trait]
pub trait StoreTx: Send {
    // products
    async fn insert_product(
        &mut self,
        new: &NewProduct,
        now: DateTime<Utc>,
    ) -> StoreResult<Product>;
    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn products(&mut self, available: Option<bool>) -> StoreResult<Vec<Product>>;
    async fn products_by_ids(&mut self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;
    async fn lock_products(&mut self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;
    async fn update_product(&mut self, product: &Product) -> StoreResult<()>;
    /// `Ok(false)` when the product does not exist.
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<bool>;

    // orders
    async fn insert_order(
        &mut self,
        movement_type: MovementType,
        now: DateTime<Utc>,
    ) -> StoreResult<Order>;
    async fn order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;
    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>>;
    async fn orders(&mut self) -> StoreResult<Vec<Order>>;
    async fn update_order(&mut self, order: &Order) -> StoreResult<()>;
    /// Deletes the order and its details. `Ok(false)` when it does not exist.
    async fn delete_order(&mut self, id: OrderId) -> StoreResult<bool>;

    // order details
    async fn insert_detail(
        &mut self,
        order_id: OrderId,
        draft: DetailDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<OrderDetail>;
    async fn detail(&mut self, id: OrderDetailId) -> StoreResult<Option<OrderDetail>>;
    async fn details_for_order(&mut self, order_id: OrderId) -> StoreResult<Vec<OrderDetail>>;
    async fn update_detail(&mut self, detail: &OrderDetail) -> StoreResult<()>;
    async fn delete_detail(&mut self, id: OrderDetailId) -> StoreResult<bool>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
