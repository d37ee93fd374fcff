use sqlx::PgExecutor;

use crate::{
    error::Result,
    models::{NewOrder, NewOrderItem, Order, OrderItem},
};

pub async fn create_order<'e>(exec: impl PgExecutor<'e>, order: &NewOrder) -> Result<Order> {
    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (user_id, total, status, address)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(order.user_id)
    .bind(order.total)
    .bind(&order.status)
    .bind(&order.address)
    .fetch_one(exec)
    .await?;

    Ok(order)
}

pub async fn create_order_item<'e>(
    exec: impl PgExecutor<'e>,
    item: &NewOrderItem,
) -> Result<OrderItem> {
    let item = sqlx::query_as::<_, OrderItem>(
        "INSERT INTO order_items (order_id, product_id, quantity, price)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(item.order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.price)
    .fetch_one(exec)
    .await?;

    Ok(item)
}
