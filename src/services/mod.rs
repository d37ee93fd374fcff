mod checkout_service;
mod checkout_store;

pub use checkout_service::{
    CheckoutError, CheckoutService, CheckoutStore, CheckoutTx, InventoryQuery, OrderPersistence,
    StockMutation, ORDER_STATUS_PENDING,
};
pub use checkout_store::PgCheckoutStore;
