use crate::error::Result;
use crate::model::{
    Cart, CartOwner, ModelId, NewOrder, OrderItem, Paged, PaymentResult, PlacedOrder, Product,
    SalesSummary, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read access to the product catalog.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_product(&self, product_id: ModelId) -> Result<Option<Product>>;
}

/// Keyed cart store: one cart per session id or user id.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn get_cart(&self, owner: &CartOwner) -> Result<Option<Cart>>;

    /// Upsert keyed by the cart's owner.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;

    /// Move an anonymous session cart under the signed-in user's key.
    async fn reattach_cart(&self, session_id: &str, user_id: ModelId) -> Result<()>;
}

/// Read access to user profiles (saved address and payment method).
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: ModelId) -> Result<Option<User>>;
}

/// Order persistence. Every mutating operation here is a single atomic
/// transaction: partial application is never observable, concurrent
/// settlement attempts on the same order serialize at this boundary.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order with its item snapshots and empty the source cart,
    /// all-or-nothing. Returns the new order's id.
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<OrderItem>,
        cart_owner: &CartOwner,
    ) -> Result<ModelId>;

    /// Load an order together with its line items.
    async fn get_order(&self, order_id: ModelId) -> Result<Option<PlacedOrder>>;

    /// Decrement stock for every line item and flip the order to paid, in
    /// one transaction. The paid flip is conditional on the order still
    /// being unpaid, so a duplicate settlement loses with `AlreadyPaid`
    /// and mutates no stock; a failed decrement rolls the whole settlement
    /// back and the order stays unpaid.
    async fn settle_order(
        &self,
        order_id: ModelId,
        payment_result: Option<PaymentResult>,
        paid_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Mark a paid order as delivered. Fails with `NotPaid` otherwise.
    async fn mark_delivered(&self, order_id: ModelId, delivered_at: DateTime<Utc>) -> Result<()>;

    async fn list_user_orders(
        &self,
        user_id: ModelId,
        page: u32,
        limit: u32,
    ) -> Result<Paged<PlacedOrder>>;

    async fn list_all_orders(&self, page: u32, limit: u32) -> Result<Paged<PlacedOrder>>;

    async fn delete_order(&self, order_id: ModelId) -> Result<()>;

    async fn sales_summary(&self) -> Result<SalesSummary>;
}
