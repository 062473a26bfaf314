//! Shared builders for the checkout integration tests: an in-memory
//! storage wired into every service, plus small data factories.

#![allow(dead_code)]

use checkout::assembler::OrderAssembler;
use checkout::cart::CartService;
use checkout::fulfillment::FulfillmentTracker;
use checkout::memory::MemoryStorage;
use checkout::model::{
    CartItem, CartOwner, ModelId, PaymentMethod, Product, ShippingAddress, User,
};
use checkout::money::Money;
use checkout::settlement::{LogReceiptSender, ReceiptSender, SettlementHandler};
use std::sync::Arc;

pub fn product(id: ModelId, name: &str, price: &str, stock: i32) -> Product {
    Product {
        id,
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        price: Money::parse(price).unwrap(),
        stock,
        image: format!("/images/{id}.jpg"),
    }
}

pub fn cart_item(product: &Product, qty: u32) -> CartItem {
    CartItem {
        product_id: product.id,
        name: product.name.clone(),
        slug: product.slug.clone(),
        price: product.price,
        qty,
        image: product.image.clone(),
    }
}

pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Jane Doe".to_string(),
        street_address: "123 Main St".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
        country: "US".to_string(),
        lat: None,
        lng: None,
    }
}

pub fn user_with_profile(id: ModelId) -> User {
    User {
        id,
        name: "Jane Doe".to_string(),
        email: format!("jane{id}@example.com"),
        address: Some(shipping_address()),
        payment_method: Some(PaymentMethod::PayPal),
    }
}

pub struct TestContext {
    pub storage: Arc<MemoryStorage>,
    pub carts: CartService,
    pub assembler: OrderAssembler,
    pub settlement: SettlementHandler,
    pub fulfillment: FulfillmentTracker,
}

pub fn context() -> TestContext {
    context_with_receipts(Arc::new(LogReceiptSender))
}

pub fn context_with_receipts(receipts: Arc<dyn ReceiptSender>) -> TestContext {
    let storage = Arc::new(MemoryStorage::new());
    TestContext {
        carts: CartService::new(storage.clone(), storage.clone()),
        assembler: OrderAssembler::new(storage.clone(), storage.clone(), storage.clone()),
        settlement: SettlementHandler::new(storage.clone(), receipts),
        fulfillment: FulfillmentTracker::new(storage.clone()),
        storage,
    }
}

/// Seed a user and products, fill the cart, and place the order.
pub async fn place_order_with(
    ctx: &TestContext,
    user_id: ModelId,
    lines: &[(Product, u32)],
) -> ModelId {
    ctx.storage.insert_user(user_with_profile(user_id)).await;
    let owner = CartOwner::User(user_id);
    for (product, qty) in lines {
        ctx.storage.insert_product(product.clone()).await;
        let added = ctx
            .carts
            .add_item_to_cart(&owner, cart_item(product, *qty))
            .await
            .unwrap();
        assert!(added.success, "seeding cart failed: {}", added.message);
    }
    let outcome = ctx.assembler.place_order(user_id, &owner).await.unwrap();
    assert!(outcome.success, "placing order failed: {}", outcome.message);
    outcome.order_id.unwrap()
}
