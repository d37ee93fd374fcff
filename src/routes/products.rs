use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{CreateProductRequest, Product, ProductListResponse, UpdateProductRequest},
    queries::product_queries,
    utils::pagination::Pagination,
};

const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 256;
const DESCRIPTION_MAX_LEN: usize = 3000;

pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ProductListResponse>> {
    let (products, count) =
        product_queries::list(&state.db, pagination.limit(), pagination.offset()).await?;

    Ok(Json(ProductListResponse {
        products,
        page: pagination.page(),
        limit: pagination.limit(),
        count,
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>> {
    if id < 1 {
        return Err(AppError::BadRequest(
            "Product id must be a positive integer".to_string(),
        ));
    }

    let product = product_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;

    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    validate_create(&payload)?;

    let product = product_queries::create(&state.db, &payload).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    validate_update(&payload)?;

    let product = product_queries::update(&state.db, id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;

    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let deleted = product_queries::delete(&state.db, id).await?;

    if !deleted {
        return Err(AppError::NotFound(format!("Product {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn validate_name(name: &str) -> Result<()> {
    let len = name.trim().len();
    if len < NAME_MIN_LEN || len > NAME_MAX_LEN {
        return Err(AppError::BadRequest(format!(
            "Name must be between {} and {} characters",
            NAME_MIN_LEN, NAME_MAX_LEN
        )));
    }

    Ok(())
}

fn validate_create(payload: &CreateProductRequest) -> Result<()> {
    validate_name(&payload.name)?;

    if payload.description.trim().is_empty() || payload.description.len() > DESCRIPTION_MAX_LEN {
        return Err(AppError::BadRequest("Invalid description".to_string()));
    }

    if payload.image.trim().is_empty() {
        return Err(AppError::BadRequest("Image is required".to_string()));
    }

    if payload.price <= Decimal::ZERO {
        return Err(AppError::BadRequest("Price must be positive".to_string()));
    }

    if payload.quantity < 0 {
        return Err(AppError::BadRequest(
            "Quantity cannot be negative".to_string(),
        ));
    }

    Ok(())
}

fn validate_update(payload: &UpdateProductRequest) -> Result<()> {
    if payload.is_empty() {
        return Err(AppError::BadRequest(
            "At least one field is required".to_string(),
        ));
    }

    if let Some(name) = &payload.name {
        validate_name(name)?;
    }

    if let Some(description) = &payload.description {
        if description.trim().is_empty() || description.len() > DESCRIPTION_MAX_LEN {
            return Err(AppError::BadRequest("Invalid description".to_string()));
        }
    }

    if let Some(price) = payload.price {
        if price <= Decimal::ZERO {
            return Err(AppError::BadRequest("Price must be positive".to_string()));
        }
    }

    if let Some(quantity) = payload.quantity {
        if quantity < 0 {
            return Err(AppError::BadRequest(
                "Quantity cannot be negative".to_string(),
            ));
        }
    }

    Ok(())
}
