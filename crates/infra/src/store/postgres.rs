//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL code | Operation | StoreError |
//! |-----------------|-----------|------------|
//! | `23505` unique violation | any | `UniqueViolation` |
//! | `23503` foreign key violation | delete | `ProtectedReference` |
//! | `23503` foreign key violation | insert/update | `MissingReference` |
//! | anything else | any | `Backend` |
//!
//! Row locks: `lock_order` and `lock_products` use `SELECT ... FOR UPDATE`,
//! products in id order so concurrent transitions lock in the same order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockflow_core::{Entity, OrderDetailId, OrderId, Price, ProductId};
use stockflow_orders::{DetailDraft, MovementType, Order, OrderDetail, OrderStatus};
use stockflow_products::{NewProduct, Product};

use super::{InventoryStore, StoreError, StoreResult, StoreTx};

const SCHEMA: &str = include_str!("../../migrations/0001_inventory.sql");

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a small pool sized for a single API process.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

const PRODUCT_COLUMNS: &str = "id, name, price, stock, available, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, movement_type, status, created_at, updated_at";
const DETAIL_COLUMNS: &str = "id, order_id, product_id, quantity, created_at, updated_at";

fn raw_ids<T: Copy + Into<i64>>(ids: &[T]) -> Vec<i64> {
    ids.iter().map(|id| (*id).into()).collect()
}

#[async_trait]
impl StoreTx for PostgresTx {
    #[instrument(skip(self, new), fields(name = %new.name), err)]
    async fn insert_product(
        &mut self,
        new: &NewProduct,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let row = sqlx::query(&format!(
            "INSERT INTO products (name, price, stock, available, created_at, updated_at) \
             VALUES ($1, $2, 0, $3, $4, $4) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(new.price.amount())
        .bind(new.available)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        product_from_row(&row)
    }

    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("load_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn products(&mut self, available: Option<bool>) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::BOOLEAN IS NULL OR available = $1) ORDER BY id"
        ))
        .bind(available)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn products_by_ids(&mut self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(raw_ids(ids))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("load_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), fields(count = ids.len()), err)]
    async fn lock_products(&mut self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(raw_ids(ids))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(
        skip(self, product),
        fields(product_id = %product.id(), stock = product.stock()),
        err
    )]
    async fn update_product(&mut self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            "UPDATE products SET name = $2, price = $3, stock = $4, available = $5, \
             updated_at = $6 WHERE id = $1",
        )
        .bind(product.id().get())
        .bind(product.name())
        .bind(product.price().amount())
        .bind(product.stock())
        .bind(product.is_available())
        .bind(product.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(movement_type = %movement_type), err)]
    async fn insert_order(
        &mut self,
        movement_type: MovementType,
        now: DateTime<Utc>,
    ) -> StoreResult<Order> {
        let row = sqlx::query(&format!(
            "INSERT INTO orders (movement_type, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $3) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(movement_type.as_str())
        .bind(OrderStatus::Draft.as_str())
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        order_from_row(&row)
    }

    async fn order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("load_order", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn lock_order(&mut self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_order", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn orders(&mut self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id"))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;
        rows.iter().map(order_from_row).collect()
    }

    #[instrument(skip(self, order), fields(order_id = %order.id(), status = %order.status()), err)]
    async fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        sqlx::query(
            "UPDATE orders SET movement_type = $2, status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(order.id().get())
        .bind(order.movement_type().as_str())
        .bind(order.status().as_str())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete_order(&mut self, id: OrderId) -> StoreResult<bool> {
        // order_details cascade
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        skip(self, draft),
        fields(order_id = %order_id, product_id = %draft.product_id),
        err
    )]
    async fn insert_detail(
        &mut self,
        order_id: OrderId,
        draft: DetailDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<OrderDetail> {
        let row = sqlx::query(&format!(
            "INSERT INTO order_details (order_id, product_id, quantity, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) RETURNING {DETAIL_COLUMNS}"
        ))
        .bind(order_id.get())
        .bind(draft.product_id.get())
        .bind(draft.quantity)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_detail", e))?;
        detail_from_row(&row)
    }

    async fn detail(&mut self, id: OrderDetailId) -> StoreResult<Option<OrderDetail>> {
        let row = sqlx::query(&format!(
            "SELECT {DETAIL_COLUMNS} FROM order_details WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("load_detail", e))?;
        row.as_ref().map(detail_from_row).transpose()
    }

    async fn details_for_order(&mut self, order_id: OrderId) -> StoreResult<Vec<OrderDetail>> {
        let rows = sqlx::query(&format!(
            "SELECT {DETAIL_COLUMNS} FROM order_details WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_details", e))?;
        rows.iter().map(detail_from_row).collect()
    }

    #[instrument(skip(self, detail), fields(detail_id = %detail.id()), err)]
    async fn update_detail(&mut self, detail: &OrderDetail) -> StoreResult<()> {
        sqlx::query(
            "UPDATE order_details SET product_id = $2, quantity = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(detail.id().get())
        .bind(detail.product_id().get())
        .bind(detail.quantity())
        .bind(detail.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_detail", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(detail_id = %id), err)]
    async fn delete_detail(&mut self, id: OrderDetailId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM order_details WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_detail", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let price: f64 = row.try_get("price").map_err(decode_error)?;
    Ok(Product::restore(
        ProductId::new(row.try_get("id").map_err(decode_error)?),
        row.try_get("name").map_err(decode_error)?,
        Price::new(price).map_err(|e| StoreError::Backend(format!("stored price: {e}")))?,
        row.try_get("stock").map_err(decode_error)?,
        row.try_get("available").map_err(decode_error)?,
        row.try_get("created_at").map_err(decode_error)?,
        row.try_get("updated_at").map_err(decode_error)?,
    ))
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let movement: String = row.try_get("movement_type").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    Ok(Order::restore(
        OrderId::new(row.try_get("id").map_err(decode_error)?),
        movement
            .parse()
            .map_err(|e| StoreError::Backend(format!("stored movement_type: {e}")))?,
        status
            .parse()
            .map_err(|e| StoreError::Backend(format!("stored status: {e}")))?,
        row.try_get("created_at").map_err(decode_error)?,
        row.try_get("updated_at").map_err(decode_error)?,
    ))
}

fn detail_from_row(row: &PgRow) -> StoreResult<OrderDetail> {
    Ok(OrderDetail::restore(
        OrderDetailId::new(row.try_get("id").map_err(decode_error)?),
        OrderId::new(row.try_get("order_id").map_err(decode_error)?),
        ProductId::new(row.try_get("product_id").map_err(decode_error)?),
        row.try_get("quantity").map_err(decode_error)?,
        row.try_get("created_at").map_err(decode_error)?,
        row.try_get("updated_at").map_err(decode_error)?,
    ))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(msg),
                Some("23503") if operation.starts_with("delete") => {
                    StoreError::ProtectedReference(msg)
                }
                Some("23503") => StoreError::MissingReference(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Backend(format!("{} failed: {}", operation, other)),
    }
}
