use crate::error::{CheckoutError, Result};
use crate::model::{
    Cart, CartOwner, ModelId, NewOrder, OrderItem, Paged, PaymentResult, PlacedOrder, Product,
    SalesSummary, User,
};
use crate::money::Money;
use crate::storage::{CartStore, OrderStore, ProductStore, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    products: HashMap<ModelId, Product>,
    carts: HashMap<CartOwner, Cart>,
    users: HashMap<ModelId, User>,
    orders: BTreeMap<ModelId, PlacedOrder>,
    next_order_id: ModelId,
}

/// In-memory storage backend.
///
/// Backs tests and single-process deployments. The whole state sits behind
/// one async mutex; mutating composite operations run against a cloned
/// snapshot that is swapped in only if every step succeeded, which gives
/// the same commit/rollback contract as the Postgres backend and
/// serializes concurrent settlements on the lock.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `f`'s changes only if it returns `Ok`.
    async fn with_transaction<R>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self.state.lock().await;
        let mut staged = guard.clone();
        let out = f(&mut staged)?;
        *guard = staged;
        Ok(out)
    }

    pub async fn insert_product(&self, product: Product) {
        let mut guard = self.state.lock().await;
        guard.products.insert(product.id, product);
    }

    pub async fn insert_user(&self, user: User) {
        let mut guard = self.state.lock().await;
        guard.users.insert(user.id, user);
    }

    pub async fn product_stock(&self, product_id: ModelId) -> Option<i32> {
        let guard = self.state.lock().await;
        guard.products.get(&product_id).map(|p| p.stock)
    }
}

#[async_trait]
impl ProductStore for MemoryStorage {
    async fn get_product(&self, product_id: ModelId) -> Result<Option<Product>> {
        let guard = self.state.lock().await;
        Ok(guard.products.get(&product_id).cloned())
    }
}

#[async_trait]
impl CartStore for MemoryStorage {
    async fn get_cart(&self, owner: &CartOwner) -> Result<Option<Cart>> {
        let guard = self.state.lock().await;
        Ok(guard.carts.get(owner).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut guard = self.state.lock().await;
        guard.carts.insert(cart.owner.clone(), cart.clone());
        Ok(())
    }

    async fn reattach_cart(&self, session_id: &str, user_id: ModelId) -> Result<()> {
        self.with_transaction(|state| {
            let session_key = CartOwner::Session(session_id.to_string());
            if let Some(mut cart) = state.carts.remove(&session_key) {
                debug!("Re-attaching session cart {} to user {}", session_id, user_id);
                cart.owner = CartOwner::User(user_id);
                state.carts.insert(cart.owner.clone(), cart);
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn get_user(&self, user_id: ModelId) -> Result<Option<User>> {
        let guard = self.state.lock().await;
        Ok(guard.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl OrderStore for MemoryStorage {
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<OrderItem>,
        cart_owner: &CartOwner,
    ) -> Result<ModelId> {
        self.with_transaction(|state| {
            state.next_order_id += 1;
            let order_id = state.next_order_id;

            let placed = PlacedOrder {
                id: order_id,
                user_id: order.user_id,
                shipping_address: order.shipping_address,
                payment_method: order.payment_method,
                totals: order.totals,
                items,
                is_paid: false,
                paid_at: None,
                is_delivered: false,
                delivered_at: None,
                payment_result: None,
                created_at: Utc::now(),
            };
            state.orders.insert(order_id, placed);

            let cart = state
                .carts
                .get_mut(cart_owner)
                .ok_or(CheckoutError::NotFound("Cart"))?;
            cart.clear();

            info!("Created order {} and cleared source cart", order_id);
            Ok(order_id)
        })
        .await
    }

    async fn get_order(&self, order_id: ModelId) -> Result<Option<PlacedOrder>> {
        let guard = self.state.lock().await;
        Ok(guard.orders.get(&order_id).cloned())
    }

    async fn settle_order(
        &self,
        order_id: ModelId,
        payment_result: Option<PaymentResult>,
        paid_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_transaction(|state| {
            let items = {
                let order = state
                    .orders
                    .get(&order_id)
                    .ok_or(CheckoutError::NotFound("Order"))?;
                if order.is_paid {
                    return Err(CheckoutError::AlreadyPaid);
                }
                order.items.clone()
            };

            for item in &items {
                let product = state
                    .products
                    .get_mut(&item.product_id)
                    .ok_or(CheckoutError::NotFound("Product"))?;
                let remaining = i64::from(product.stock) - i64::from(item.qty);
                if remaining < 0 {
                    return Err(CheckoutError::OutOfStock {
                        product: product.name.clone(),
                    });
                }
                let remaining = remaining as i32;
                debug!(
                    "Decrementing stock for product {}: {} -> {}",
                    product.id, product.stock, remaining
                );
                product.stock = remaining;
            }

            let order = state
                .orders
                .get_mut(&order_id)
                .ok_or(CheckoutError::NotFound("Order"))?;
            order.is_paid = true;
            order.paid_at = Some(paid_at);
            order.payment_result = payment_result;

            info!("Settled order {}", order_id);
            Ok(())
        })
        .await
    }

    async fn mark_delivered(&self, order_id: ModelId, delivered_at: DateTime<Utc>) -> Result<()> {
        self.with_transaction(|state| {
            let order = state
                .orders
                .get_mut(&order_id)
                .ok_or(CheckoutError::NotFound("Order"))?;
            if !order.is_paid {
                return Err(CheckoutError::NotPaid);
            }
            order.is_delivered = true;
            order.delivered_at = Some(delivered_at);
            info!("Marked order {} as delivered", order_id);
            Ok(())
        })
        .await
    }

    async fn list_user_orders(
        &self,
        user_id: ModelId,
        page: u32,
        limit: u32,
    ) -> Result<Paged<PlacedOrder>> {
        let guard = self.state.lock().await;
        let mut orders: Vec<PlacedOrder> = guard
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(paginate(&mut orders, page, limit))
    }

    async fn list_all_orders(&self, page: u32, limit: u32) -> Result<Paged<PlacedOrder>> {
        let guard = self.state.lock().await;
        let mut orders: Vec<PlacedOrder> = guard.orders.values().cloned().collect();
        Ok(paginate(&mut orders, page, limit))
    }

    async fn delete_order(&self, order_id: ModelId) -> Result<()> {
        self.with_transaction(|state| {
            state
                .orders
                .remove(&order_id)
                .ok_or(CheckoutError::NotFound("Order"))?;
            Ok(())
        })
        .await
    }

    async fn sales_summary(&self) -> Result<SalesSummary> {
        let guard = self.state.lock().await;
        let total_sales: Money = guard.orders.values().map(|o| o.totals.total_price).sum();
        Ok(SalesSummary {
            orders_count: guard.orders.len() as u64,
            products_count: guard.products.len() as u64,
            users_count: guard.users.len() as u64,
            total_sales,
        })
    }
}

fn paginate(orders: &mut Vec<PlacedOrder>, page: u32, limit: u32) -> Paged<PlacedOrder> {
    let limit = limit.max(1);
    let page = page.max(1);
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let total = orders.len() as u32;
    let total_pages = total.div_ceil(limit);
    let start = (u64::from(page - 1) * u64::from(limit)).min(orders.len() as u64) as usize;
    let data = orders
        .iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect();

    Paged { data, total_pages }
}
