mod cart;
mod health;
mod login;
mod products;
mod register;

use axum::{Router, middleware, routing::{get, post}};

use crate::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    let api = Router::new()
        .route("/register", post(register::register_user))
        .route("/login", post(login::login_user))
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/cart/checkout",
            post(cart::checkout).route_layer(middleware::from_fn_with_state(
                state,
                crate::middleware::auth_middleware,
            )),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/api/v1", api)
}
