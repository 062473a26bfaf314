use crate::error::{CheckoutError, Result};
use crate::model::{ActionResult, Cart, CartItem, CartOwner, ModelId};
use crate::storage::{CartStore, ProductStore};
use std::sync::Arc;
use tracing::debug;

/// Cart mutations. Every path re-derives the cart's money fields before the
/// cart is saved, and quantity never exceeds the product's current stock.
pub struct CartService {
    products: Arc<dyn ProductStore>,
    carts: Arc<dyn CartStore>,
}

impl CartService {
    pub fn new(products: Arc<dyn ProductStore>, carts: Arc<dyn CartStore>) -> Self {
        Self { products, carts }
    }

    pub async fn get_cart(&self, owner: &CartOwner) -> Result<Option<Cart>> {
        self.carts.get_cart(owner).await
    }

    /// Attach an anonymous session cart to a freshly signed-in user.
    pub async fn attach_session_cart(&self, session_id: &str, user_id: ModelId) -> Result<()> {
        self.carts.reattach_cart(session_id, user_id).await
    }

    pub async fn add_item_to_cart(
        &self,
        owner: &CartOwner,
        item: CartItem,
    ) -> Result<ActionResult> {
        into_action(self.add_item_inner(owner, item).await)
    }

    async fn add_item_inner(&self, owner: &CartOwner, item: CartItem) -> Result<ActionResult> {
        if item.qty == 0 {
            return Err(CheckoutError::Validation(
                "Quantity must be at least one".to_string(),
            ));
        }

        let product = self
            .products
            .get_product(item.product_id)
            .await?
            .ok_or(CheckoutError::NotFound("Product"))?;

        let mut cart = match self.carts.get_cart(owner).await? {
            Some(cart) => cart,
            None => Cart::new(owner.clone()),
        };

        let message;
        if let Some(existing) = cart
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            let wanted = existing.qty.checked_add(item.qty).ok_or_else(|| {
                CheckoutError::Validation("Quantity is too large".to_string())
            })?;
            // Widened compare: a qty above i32::MAX must not wrap past
            // the stock check.
            if i64::from(product.stock) < i64::from(wanted) {
                return Err(CheckoutError::OutOfStock {
                    product: product.name.clone(),
                });
            }
            existing.qty = wanted;
            message = format!("{} updated in cart", product.name);
        } else {
            if i64::from(product.stock) < i64::from(item.qty) {
                return Err(CheckoutError::OutOfStock {
                    product: product.name.clone(),
                });
            }
            cart.items.push(item);
            message = format!("{} added to cart", product.name);
        }

        cart.recompute_totals();
        self.carts.save_cart(&cart).await?;
        debug!("Cart for {:?} now has {} lines", owner, cart.items.len());

        Ok(ActionResult::ok(message))
    }

    pub async fn remove_item_from_cart(
        &self,
        owner: &CartOwner,
        product_id: ModelId,
    ) -> Result<ActionResult> {
        into_action(self.remove_item_inner(owner, product_id).await)
    }

    async fn remove_item_inner(
        &self,
        owner: &CartOwner,
        product_id: ModelId,
    ) -> Result<ActionResult> {
        let product = self
            .products
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::NotFound("Product"))?;

        let mut cart = self
            .carts
            .get_cart(owner)
            .await?
            .ok_or(CheckoutError::NotFound("Cart"))?;

        let line = cart
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
            .ok_or(CheckoutError::NotFound("Item"))?;

        if line.qty == 1 {
            cart.items.retain(|line| line.product_id != product_id);
        } else {
            line.qty -= 1;
        }

        cart.recompute_totals();
        self.carts.save_cart(&cart).await?;

        Ok(ActionResult::ok(format!(
            "{} removed from cart",
            product.name
        )))
    }
}

/// Catch domain failures at the action boundary; the navigation redirect
/// signal re-propagates untouched.
pub(crate) fn into_action(result: Result<ActionResult>) -> Result<ActionResult> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(err) if err.is_redirect() => Err(err),
        Err(err) => Ok(ActionResult::fail(err.to_string())),
    }
}
