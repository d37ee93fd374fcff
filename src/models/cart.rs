use serde::Deserialize;

/// One cart line: product id plus requested quantity. Lives only for the
/// duration of a checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct CartCheckoutItem {
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartCheckoutRequest {
    pub cart_items: Vec<CartCheckoutItem>,
}
