use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::Result,
    models::{CartCheckoutRequest, CheckoutResponse},
    utils::{extractors::extract_user_id, jwt::Claims},
};

pub async fn checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CartCheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let user_id = extract_user_id(&claims)?;

    let order = state.checkout.checkout(user_id, &payload).await?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse { order })))
}
