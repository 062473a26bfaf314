use crate::cart::into_action;
use crate::error::{CheckoutError, Result};
use crate::model::{ActionResult, ModelId};
use crate::storage::OrderStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Marks paid orders as delivered. The transition is one-way: there is no
/// "mark undelivered", and an unpaid order can never skip straight to
/// delivered.
pub struct FulfillmentTracker {
    orders: Arc<dyn OrderStore>,
}

impl FulfillmentTracker {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    pub async fn deliver_order(&self, order_id: ModelId) -> Result<ActionResult> {
        into_action(self.deliver_inner(order_id).await)
    }

    async fn deliver_inner(&self, order_id: ModelId) -> Result<ActionResult> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::NotFound("Order"))?;
        if !order.is_paid {
            return Err(CheckoutError::NotPaid);
        }

        self.orders.mark_delivered(order_id, Utc::now()).await?;
        info!("Order {} marked as delivered", order_id);

        Ok(ActionResult::ok("Order marked as delivered."))
    }
}
