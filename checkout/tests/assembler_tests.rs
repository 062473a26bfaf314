mod fixtures;

use async_trait::async_trait;
use checkout::assembler::OrderAssembler;
use checkout::error::{CheckoutError, Result};
use checkout::model::{
    Cart, CartOwner, ModelId, NewOrder, OrderItem, Paged, PaymentResult, PlacedOrder,
    SalesSummary, User,
};
use checkout::storage::{CartStore, OrderStore, UserStore};
use chrono::{DateTime, Utc};
use fixtures::{cart_item, context, product, user_with_profile};
use mockall::mock;
use std::sync::Arc;

#[tokio::test]
async fn empty_cart_is_rejected_and_no_order_is_created() {
    let ctx = context();
    ctx.storage.insert_user(user_with_profile(1)).await;

    let outcome = ctx
        .assembler
        .place_order(1, &CartOwner::User(1))
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message, "Cart is empty");
    assert_eq!(outcome.redirect_to.as_deref(), Some("/cart"));
    assert!(outcome.order_id.is_none());
    assert_eq!(ctx.storage.sales_summary().await.unwrap().orders_count, 0);
}

#[tokio::test]
async fn missing_address_points_at_the_address_form() {
    let ctx = context();
    let mut user = user_with_profile(1);
    user.address = None;
    ctx.storage.insert_user(user).await;

    let widget = product(1, "Widget", "30.00", 5);
    ctx.storage.insert_product(widget.clone()).await;
    let owner = CartOwner::User(1);
    ctx.carts
        .add_item_to_cart(&owner, cart_item(&widget, 1))
        .await
        .unwrap();

    let outcome = ctx.assembler.place_order(1, &owner).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "No address saved");
    assert_eq!(outcome.redirect_to.as_deref(), Some("/shipping-address"));
}

#[tokio::test]
async fn missing_payment_method_points_at_the_payment_form() {
    let ctx = context();
    let mut user = user_with_profile(1);
    user.payment_method = None;
    ctx.storage.insert_user(user).await;

    let widget = product(1, "Widget", "30.00", 5);
    ctx.storage.insert_product(widget.clone()).await;
    let owner = CartOwner::User(1);
    ctx.carts
        .add_item_to_cart(&owner, cart_item(&widget, 1))
        .await
        .unwrap();

    let outcome = ctx.assembler.place_order(1, &owner).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "No payment method saved");
    assert_eq!(outcome.redirect_to.as_deref(), Some("/payment-method"));
}

#[tokio::test]
async fn placing_an_order_snapshots_the_cart_and_empties_it() {
    let ctx = context();
    ctx.storage.insert_user(user_with_profile(1)).await;
    let jacket = product(1, "Jacket", "60.00", 5);
    ctx.storage.insert_product(jacket.clone()).await;

    let owner = CartOwner::User(1);
    ctx.carts
        .add_item_to_cart(&owner, cart_item(&jacket, 2))
        .await
        .unwrap();

    let outcome = ctx.assembler.place_order(1, &owner).await.unwrap();
    assert!(outcome.success);
    let order_id = outcome.order_id.unwrap();
    assert_eq!(
        outcome.redirect_to.as_deref(),
        Some(format!("/order/{order_id}").as_str())
    );

    let order = ctx.storage.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.user_id, 1);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].qty, 2);
    assert_eq!(order.totals.items_price.to_string(), "120.00");
    assert_eq!(order.totals.total_price.to_string(), "138.00");
    assert!(!order.is_paid);
    assert!(!order.is_delivered);

    // The source cart survives as an empty cart with zeroed totals.
    let cart = ctx.carts.get_cart(&owner).await.unwrap().unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.totals.total_price.to_string(), "0.00");
}

#[tokio::test]
async fn order_items_are_decoupled_from_later_price_changes() {
    let ctx = context();
    ctx.storage.insert_user(user_with_profile(1)).await;
    let mut widget = product(1, "Widget", "30.00", 5);
    ctx.storage.insert_product(widget.clone()).await;

    let owner = CartOwner::User(1);
    ctx.carts
        .add_item_to_cart(&owner, cart_item(&widget, 1))
        .await
        .unwrap();
    let order_id = ctx
        .assembler
        .place_order(1, &owner)
        .await
        .unwrap()
        .order_id
        .unwrap();

    // Reprice the live product; the historical order must not move.
    widget.price = checkout::money::Money::parse("99.99").unwrap();
    ctx.storage.insert_product(widget).await;

    let order = ctx.storage.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.items[0].price.to_string(), "30.00");
}

mock! {
    pub Carts {}

    #[async_trait]
    impl CartStore for Carts {
        async fn get_cart(&self, owner: &CartOwner) -> Result<Option<Cart>>;
        async fn save_cart(&self, cart: &Cart) -> Result<()>;
        async fn reattach_cart(&self, session_id: &str, user_id: ModelId) -> Result<()>;
    }
}

mock! {
    pub Users {}

    #[async_trait]
    impl UserStore for Users {
        async fn get_user(&self, user_id: ModelId) -> Result<Option<User>>;
    }
}

mock! {
    pub Orders {}

    #[async_trait]
    impl OrderStore for Orders {
        async fn create_order(
            &self,
            order: NewOrder,
            items: Vec<OrderItem>,
            cart_owner: &CartOwner,
        ) -> Result<ModelId>;
        async fn get_order(&self, order_id: ModelId) -> Result<Option<PlacedOrder>>;
        async fn settle_order(
            &self,
            order_id: ModelId,
            payment_result: Option<PaymentResult>,
            paid_at: DateTime<Utc>,
        ) -> Result<()>;
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
}

#[tokio::test]
async fn infrastructure_failure_surfaces_as_a_generic_failure() {
    let mut carts = MockCarts::new();
    carts.expect_get_cart().returning(|owner| {
        let mut cart = Cart::new(owner.clone());
        let widget = product(1, "Widget", "30.00", 5);
        cart.items.push(cart_item(&widget, 1));
        cart.recompute_totals();
        Ok(Some(cart))
    });

    let mut users = MockUsers::new();
    users.expect_get_user().returning(|id| Ok(Some(user_with_profile(id))));

    let mut orders = MockOrders::new();
    orders
        .expect_create_order()
        .returning(|_, _, _| Err(CheckoutError::Storage("connection reset".to_string())));

    let assembler = OrderAssembler::new(Arc::new(carts), Arc::new(users), Arc::new(orders));
    let outcome = assembler
        .place_order(1, &CartOwner::User(1))
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message, "storage error: connection reset");
    assert!(outcome.order_id.is_none());
}

#[tokio::test]
async fn navigation_redirect_signal_passes_through_untouched() {
    let mut carts = MockCarts::new();
    carts
        .expect_get_cart()
        .returning(|_| Err(CheckoutError::Redirect("/sign-in".to_string())));

    let mut users = MockUsers::new();
    users.expect_get_user().returning(|id| Ok(Some(user_with_profile(id))));

    let orders = MockOrders::new();

    let assembler = OrderAssembler::new(Arc::new(carts), Arc::new(users), Arc::new(orders));
    let err = assembler
        .place_order(1, &CartOwner::User(1))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Redirect(to) if to == "/sign-in"));
}
