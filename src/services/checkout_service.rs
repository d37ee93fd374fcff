use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    error::{AppError, Result},
    models::{CartCheckoutItem, CartCheckoutRequest, NewOrder, NewOrderItem, Order, OrderItem, Product},
};

pub const ORDER_STATUS_PENDING: &str = "pending";

// The reference flow does not source a shipping address from the request or
// the user profile; orders are created with this placeholder.
const ORDER_ADDRESS_PLACEHOLDER: &str = "address";

/// Batched product resolution. Ids not present in storage are simply absent
/// from the result; the orchestrator detects absence itself. Callers must not
/// pass an empty id set.
#[async_trait]
pub trait InventoryQuery {
    async fn products_by_ids(&mut self, ids: &[i32]) -> Result<Vec<Product>>;
}

/// Absolute stock update. An id with no matching row is a not-found error,
/// never a silent no-op.
#[async_trait]
pub trait StockMutation {
    async fn set_product_quantity(&mut self, product_id: i32, quantity: i32) -> Result<Product>;
}

#[async_trait]
pub trait OrderPersistence {
    async fn create_order(&mut self, order: NewOrder) -> Result<Order>;
    async fn create_order_item(&mut self, item: NewOrderItem) -> Result<OrderItem>;
}

/// One checkout's unit of work. All reads and writes issued through a single
/// handle belong to the same transaction; dropping the handle without
/// committing discards every mutation issued through it.
#[async_trait]
pub trait CheckoutTx: InventoryQuery + StockMutation + OrderPersistence + Send {
    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn CheckoutTx>>;
}

/// Domain failures of the checkout flow, classified by kind so callers never
/// have to inspect message text.
#[derive(Debug)]
pub enum CheckoutError {
    EmptyCart,
    InvalidQuantity {
        product_id: i32,
    },
    UnknownProduct {
        product_id: i32,
    },
    InsufficientStock {
        product_id: i32,
        requested: i32,
        available: i32,
    },
    Storage(AppError),
}

impl fmt::Display for CheckoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutError::EmptyCart => write!(f, "cart is empty"),
            CheckoutError::InvalidQuantity { product_id } => {
                write!(f, "product with id {} has invalid quantity", product_id)
            }
            CheckoutError::UnknownProduct { product_id } => {
                write!(f, "product with id {} does not exist", product_id)
            }
            CheckoutError::InsufficientStock {
                product_id,
                requested,
                available,
            } => write!(
                f,
                "requested {} of product {} but only {} available",
                requested, product_id, available
            ),
            CheckoutError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CheckoutError {}

impl From<AppError> for CheckoutError {
    fn from(err: AppError) -> Self {
        CheckoutError::Storage(err)
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart
            | CheckoutError::InvalidQuantity { .. }
            | CheckoutError::InsufficientStock { .. } => AppError::BadRequest(err.to_string()),
            CheckoutError::UnknownProduct { .. } => AppError::NotFound(err.to_string()),
            CheckoutError::Storage(e) => e,
        }
    }
}

/// Converts a cart into a persisted order plus order lines, decrementing
/// stock along the way. Depends only on the storage capability traits, so
/// tests substitute an in-memory store.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn CheckoutStore>,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn CheckoutStore>) -> Self {
        Self { store }
    }

    pub async fn checkout(
        &self,
        user_id: i32,
        cart: &CartCheckoutRequest,
    ) -> std::result::Result<Order, CheckoutError> {
        // Pure validation; fails before any storage access.
        let product_ids = requested_product_ids(cart)?;

        let mut tx = self.store.begin().await?;

        let products = tx.products_by_ids(&product_ids).await?;
        let products_by_id: HashMap<i32, Product> =
            products.into_iter().map(|p| (p.id, p)).collect();

        check_availability(&cart.cart_items, &products_by_id)?;

        let total = order_total(&cart.cart_items, &products_by_id);

        for item in &cart.cart_items {
            let product = &products_by_id[&item.product_id];
            tx.set_product_quantity(product.id, product.quantity - item.quantity)
                .await?;
        }

        let order = tx
            .create_order(NewOrder {
                user_id,
                total,
                status: ORDER_STATUS_PENDING.to_string(),
                address: ORDER_ADDRESS_PLACEHOLDER.to_string(),
            })
            .await?;

        for item in &cart.cart_items {
            tx.create_order_item(NewOrderItem {
                order_id: order.id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: products_by_id[&item.product_id].price,
            })
            .await?;
        }

        tx.commit().await?;

        Ok(order)
    }
}

/// Distinct product ids of the cart in first-seen order. Rejects empty carts
/// and non-positive quantities before any lookup happens.
fn requested_product_ids(
    cart: &CartCheckoutRequest,
) -> std::result::Result<Vec<i32>, CheckoutError> {
    if cart.cart_items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(cart.cart_items.len());

    for item in &cart.cart_items {
        if item.quantity <= 0 {
            return Err(CheckoutError::InvalidQuantity {
                product_id: item.product_id,
            });
        }

        if seen.insert(item.product_id) {
            ids.push(item.product_id);
        }
    }

    Ok(ids)
}

fn check_availability(
    cart_items: &[CartCheckoutItem],
    products_by_id: &HashMap<i32, Product>,
) -> std::result::Result<(), CheckoutError> {
    for item in cart_items {
        let product =
            products_by_id
                .get(&item.product_id)
                .ok_or(CheckoutError::UnknownProduct {
                    product_id: item.product_id,
                })?;

        if product.quantity < item.quantity {
            return Err(CheckoutError::InsufficientStock {
                product_id: item.product_id,
                requested: item.quantity,
                available: product.quantity,
            });
        }
    }

    Ok(())
}

fn order_total(cart_items: &[CartCheckoutItem], products_by_id: &HashMap<i32, Product>) -> Decimal {
    cart_items
        .iter()
        .map(|item| products_by_id[&item.product_id].price * Decimal::from(item.quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::dec;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    struct MemState {
        products: HashMap<i32, Product>,
        orders: Vec<Order>,
        order_items: Vec<OrderItem>,
        next_order_id: i32,
        lookups: usize,
        stock_writes: usize,
    }

    struct MemStore {
        state: Arc<Mutex<MemState>>,
    }

    impl MemStore {
        fn with_products(products: Vec<Product>) -> Self {
            Self {
                state: Arc::new(Mutex::new(MemState {
                    products: products.into_iter().map(|p| (p.id, p)).collect(),
                    orders: Vec::new(),
                    order_items: Vec::new(),
                    next_order_id: 1,
                    lookups: 0,
                    stock_writes: 0,
                })),
            }
        }
    }

    // The guard is held from begin() to drop, so concurrent checkouts
    // serialize exactly like row-locked transactions on overlapping products.
    struct MemTx {
        guard: OwnedMutexGuard<MemState>,
    }

    #[async_trait]
    impl CheckoutStore for MemStore {
        async fn begin(&self) -> Result<Box<dyn CheckoutTx>> {
            let guard = self.state.clone().lock_owned().await;
            Ok(Box::new(MemTx { guard }))
        }
    }

    #[async_trait]
    impl InventoryQuery for MemTx {
        async fn products_by_ids(&mut self, ids: &[i32]) -> Result<Vec<Product>> {
            self.guard.lookups += 1;
            Ok(ids
                .iter()
                .filter_map(|id| self.guard.products.get(id).cloned())
                .collect())
        }
    }

    #[async_trait]
    impl StockMutation for MemTx {
        async fn set_product_quantity(
            &mut self,
            product_id: i32,
            quantity: i32,
        ) -> Result<Product> {
            self.guard.stock_writes += 1;
            let product = self
                .guard
                .products
                .get_mut(&product_id)
                .ok_or_else(|| AppError::NotFound(format!("product {} not found", product_id)))?;
            product.quantity = quantity;
            Ok(product.clone())
        }
    }

    #[async_trait]
    impl OrderPersistence for MemTx {
        async fn create_order(&mut self, order: NewOrder) -> Result<Order> {
            let id = self.guard.next_order_id;
            self.guard.next_order_id += 1;

            let order = Order {
                id,
                user_id: order.user_id,
                total: order.total,
                status: order.status,
                address: order.address,
                created_at: Utc::now(),
            };
            self.guard.orders.push(order.clone());
            Ok(order)
        }

        async fn create_order_item(&mut self, item: NewOrderItem) -> Result<OrderItem> {
            if !self.guard.orders.iter().any(|o| o.id == item.order_id) {
                return Err(AppError::InternalError(format!(
                    "order {} does not exist",
                    item.order_id
                )));
            }

            let id = self.guard.order_items.len() as i32 + 1;
            let item = OrderItem {
                id,
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                created_at: Utc::now(),
            };
            self.guard.order_items.push(item.clone());
            Ok(item)
        }
    }

    #[async_trait]
    impl CheckoutTx for MemTx {
        async fn commit(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn product(id: i32, price: Decimal, quantity: i32) -> Product {
        Product {
            id,
            name: format!("product-{}", id),
            description: "test product".to_string(),
            image: "image.png".to_string(),
            price,
            quantity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cart(items: &[(i32, i32)]) -> CartCheckoutRequest {
        CartCheckoutRequest {
            cart_items: items
                .iter()
                .map(|&(product_id, quantity)| CartCheckoutItem {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    fn service(products: Vec<Product>) -> (CheckoutService, Arc<Mutex<MemState>>) {
        let store = MemStore::with_products(products);
        let state = store.state.clone();
        (CheckoutService::new(Arc::new(store)), state)
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_any_lookup() {
        let (service, state) = service(vec![product(1, dec!(10.0), 5)]);

        let err = service.checkout(1, &cart(&[])).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        let state = state.lock().await;
        assert_eq!(state.lookups, 0);
        assert!(state.orders.is_empty());
    }

    #[tokio::test]
    async fn non_positive_quantity_rejects_whole_cart() {
        let (service, state) = service(vec![
            product(1, dec!(10.0), 5),
            product(2, dec!(4.0), 5),
        ]);

        let err = service.checkout(1, &cart(&[(1, 2), (2, 0)])).await.unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidQuantity { product_id: 2 }));
        let state = state.lock().await;
        assert_eq!(state.lookups, 0);
        assert_eq!(state.stock_writes, 0);
        assert!(state.orders.is_empty());
        assert_eq!(state.products[&1].quantity, 5);
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let (service, state) = service(vec![product(1, dec!(10.0), 5)]);

        let err = service.checkout(1, &cart(&[(1, 1), (7, 1)])).await.unwrap_err();

        assert!(matches!(err, CheckoutError::UnknownProduct { product_id: 7 }));
        let state = state.lock().await;
        assert_eq!(state.stock_writes, 0);
        assert!(state.orders.is_empty());
        assert_eq!(state.products[&1].quantity, 5);
    }

    #[tokio::test]
    async fn insufficient_stock_reports_requested_and_available() {
        let (service, state) = service(vec![product(1, dec!(10.0), 2)]);

        let err = service.checkout(1, &cart(&[(1, 5)])).await.unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock {
                product_id: 1,
                requested: 5,
                available: 2,
            }
        ));
        let state = state.lock().await;
        assert_eq!(state.stock_writes, 0);
        assert!(state.orders.is_empty());
    }

    #[tokio::test]
    async fn one_short_line_fails_the_whole_cart() {
        let (service, state) = service(vec![
            product(1, dec!(10.0), 5),
            product(2, dec!(4.0), 1),
        ]);

        let err = service.checkout(1, &cart(&[(1, 3), (2, 2)])).await.unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { product_id: 2, .. }
        ));
        let state = state.lock().await;
        assert_eq!(state.stock_writes, 0);
        assert!(state.orders.is_empty());
        assert_eq!(state.products[&1].quantity, 5);
        assert_eq!(state.products[&2].quantity, 1);
    }

    #[tokio::test]
    async fn successful_checkout_creates_order_and_lines() {
        let (service, state) = service(vec![product(1, dec!(10.0), 5)]);

        let order = service.checkout(42, &cart(&[(1, 3)])).await.unwrap();

        assert_eq!(order.user_id, 42);
        assert_eq!(order.total, dec!(30.0));
        assert_eq!(order.status, ORDER_STATUS_PENDING);

        let state = state.lock().await;
        assert_eq!(state.products[&1].quantity, 2);
        assert_eq!(state.order_items.len(), 1);
        assert_eq!(state.order_items[0].order_id, order.id);
        assert_eq!(state.order_items[0].quantity, 3);
        assert_eq!(state.order_items[0].price, dec!(10.0));
    }

    #[tokio::test]
    async fn multi_line_cart_sums_total_and_writes_one_line_per_entry() {
        let (service, state) = service(vec![
            product(1, dec!(10.0), 5),
            product(2, dec!(2.5), 8),
        ]);

        let order = service.checkout(7, &cart(&[(1, 2), (2, 4)])).await.unwrap();

        assert_eq!(order.total, dec!(30.0));

        let state = state.lock().await;
        assert_eq!(state.products[&1].quantity, 3);
        assert_eq!(state.products[&2].quantity, 4);
        assert_eq!(state.order_items.len(), 2);
    }

    #[tokio::test]
    async fn line_price_is_captured_at_checkout_time() {
        let (service, state) = service(vec![product(1, dec!(19.99), 10)]);

        let order = service.checkout(1, &cart(&[(1, 1)])).await.unwrap();

        let state = state.lock().await;
        assert_eq!(state.order_items[0].price, dec!(19.99));
        assert_eq!(order.total, dec!(19.99));
    }

    #[tokio::test]
    async fn repeated_checkout_is_not_deduplicated() {
        let (service, state) = service(vec![product(1, dec!(10.0), 10)]);

        let first = service.checkout(1, &cart(&[(1, 3)])).await.unwrap();
        let second = service.checkout(1, &cart(&[(1, 3)])).await.unwrap();

        assert_ne!(first.id, second.id);
        let state = state.lock().await;
        assert_eq!(state.orders.len(), 2);
        assert_eq!(state.products[&1].quantity, 4);
    }

    #[tokio::test]
    async fn concurrent_checkouts_cannot_oversell() {
        let (service, state) = service(vec![product(1, dec!(10.0), 5)]);

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.checkout(1, &cart(&[(1, 3)])).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.checkout(2, &cart(&[(1, 3)])).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let insufficient = results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    Err(CheckoutError::InsufficientStock {
                        requested: 3,
                        available: 2,
                        ..
                    })
                )
            })
            .count();

        assert_eq!(succeeded, 1);
        assert_eq!(insufficient, 1);

        let state = state.lock().await;
        assert_eq!(state.products[&1].quantity, 2);
        assert_eq!(state.orders.len(), 1);
    }
}
