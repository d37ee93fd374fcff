use sqlx::{PgExecutor, PgPool};

use crate::{
    error::Result,
    models::{CreateProductRequest, Product, UpdateProductRequest},
};

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(product)
}

pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY id LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    Ok((products, count))
}

/// Batched resolution with row locks, so concurrent checkouts touching the
/// same products serialize on these rows until the enclosing transaction
/// completes.
pub async fn find_by_ids_for_update<'e>(
    exec: impl PgExecutor<'e>,
    ids: &[i32],
) -> Result<Vec<Product>> {
    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1) FOR UPDATE")
            .bind(ids)
            .fetch_all(exec)
            .await?;

    Ok(products)
}

pub async fn create(pool: &PgPool, payload: &CreateProductRequest) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, description, image, price, quantity)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(payload.name.trim())
    .bind(payload.description.trim())
    .bind(&payload.image)
    .bind(payload.price)
    .bind(payload.quantity)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

pub async fn update(
    pool: &PgPool,
    id: i32,
    payload: &UpdateProductRequest,
) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET
             name = COALESCE($2, name),
             description = COALESCE($3, description),
             image = COALESCE($4, image),
             price = COALESCE($5, price),
             quantity = COALESCE($6, quantity),
             updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.description.as_deref().map(str::trim))
    .bind(payload.image.as_deref())
    .bind(payload.price)
    .bind(payload.quantity)
    .fetch_optional(pool)
    .await?;

    Ok(product)
}

/// Sets the absolute quantity-on-hand. Returns None when no row matched the
/// id, which callers must treat as not found.
pub async fn set_quantity<'e>(
    exec: impl PgExecutor<'e>,
    id: i32,
    quantity: i32,
) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET quantity = $2, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(quantity)
    .fetch_optional(exec)
    .await?;

    Ok(product)
}

pub async fn delete(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
