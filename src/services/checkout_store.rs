use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::{AppError, Result},
    models::{NewOrder, NewOrderItem, Order, OrderItem, Product},
    queries::{order_queries, product_queries},
    services::{CheckoutStore, CheckoutTx, InventoryQuery, OrderPersistence, StockMutation},
};

/// Production checkout storage. Every handle wraps one database transaction;
/// product resolution locks the touched rows so overlapping checkouts
/// serialize instead of overselling.
pub struct PgCheckoutStore {
    pool: PgPool,
}

impl PgCheckoutStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn begin(&self) -> Result<Box<dyn CheckoutTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCheckoutTx { tx }))
    }
}

struct PgCheckoutTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InventoryQuery for PgCheckoutTx {
    async fn products_by_ids(&mut self, ids: &[i32]) -> Result<Vec<Product>> {
        product_queries::find_by_ids_for_update(&mut *self.tx, ids).await
    }
}

#[async_trait]
impl StockMutation for PgCheckoutTx {
    async fn set_product_quantity(&mut self, product_id: i32, quantity: i32) -> Result<Product> {
        product_queries::set_quantity(&mut *self.tx, product_id, quantity)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {} not found", product_id)))
    }
}

#[async_trait]
impl OrderPersistence for PgCheckoutTx {
    async fn create_order(&mut self, order: NewOrder) -> Result<Order> {
        order_queries::create_order(&mut *self.tx, &order).await
    }

    async fn create_order_item(&mut self, item: NewOrderItem) -> Result<OrderItem> {
        order_queries::create_order_item(&mut *self.tx, &item).await
    }
}

#[async_trait]
impl CheckoutTx for PgCheckoutTx {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
