use crate::error::{CheckoutError, Result};
use crate::model::{CartOwner, ModelId, NewOrder, OrderItem, PlaceOrderOutcome};
use crate::storage::{CartStore, OrderStore, UserStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Turns a non-empty cart plus the owner's saved address and payment method
/// into an order, atomically clearing the source cart.
pub struct OrderAssembler {
    carts: Arc<dyn CartStore>,
    users: Arc<dyn UserStore>,
    orders: Arc<dyn OrderStore>,
}

impl OrderAssembler {
    pub fn new(
        carts: Arc<dyn CartStore>,
        users: Arc<dyn UserStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            carts,
            users,
            orders,
        }
    }

    /// Preconditions are checked in order and the first failure wins, each
    /// pointing the caller at the screen that fixes it. A redirect control
    /// signal from the navigation layer passes through unchanged; any other
    /// failure surfaces as an unsuccessful outcome.
    pub async fn place_order(
        &self,
        user_id: ModelId,
        cart_owner: &CartOwner,
    ) -> Result<PlaceOrderOutcome> {
        match self.place_order_inner(user_id, cart_owner).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_redirect() => Err(err),
            Err(err) => Ok(PlaceOrderOutcome {
                success: false,
                message: err.to_string(),
                redirect_to: None,
                order_id: None,
            }),
        }
    }

    async fn place_order_inner(
        &self,
        user_id: ModelId,
        cart_owner: &CartOwner,
    ) -> Result<PlaceOrderOutcome> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(CheckoutError::NotFound("User"))?;

        let cart = self.carts.get_cart(cart_owner).await?;
        let cart = match cart {
            Some(cart) if !cart.is_empty() => cart,
            _ => {
                debug!("place_order rejected for user {}: empty cart", user_id);
                return Ok(PlaceOrderOutcome::fail("Cart is empty", "/cart"));
            }
        };

        let Some(address) = user.address else {
            return Ok(PlaceOrderOutcome::fail(
                "No address saved",
                "/shipping-address",
            ));
        };

        let Some(payment_method) = user.payment_method else {
            return Ok(PlaceOrderOutcome::fail(
                "No payment method saved",
                "/payment-method",
            ));
        };

        let order = NewOrder {
            user_id: user.id,
            shipping_address: address,
            payment_method,
            totals: cart.totals.clone(),
        };
        let items: Vec<OrderItem> = cart.items.into_iter().map(OrderItem::from).collect();

        // Order + items insert and cart clear commit as one unit.
        let order_id = self.orders.create_order(order, items, cart_owner).await?;

        info!("User {} placed order {}", user_id, order_id);
        Ok(PlaceOrderOutcome::ok(order_id))
    }
}
