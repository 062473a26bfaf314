use crate::cart::into_action;
use crate::error::{CheckoutError, Result};
use crate::model::{ActionResult, ModelId, PaymentResult, PlacedOrder};
use crate::storage::OrderStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Follow-on notification hook. Sending the receipt is a side effect of a
/// successful settlement, never part of its atomicity guarantee.
#[async_trait]
pub trait ReceiptSender: Send + Sync {
    async fn send_purchase_receipt(&self, order: &PlacedOrder) -> Result<()>;
}

/// Default sender: records the event in the log and nothing else. The
/// actual email rendering lives outside this slice.
pub struct LogReceiptSender;

#[async_trait]
impl ReceiptSender for LogReceiptSender {
    async fn send_purchase_receipt(&self, order: &PlacedOrder) -> Result<()> {
        info!(
            "Purchase receipt queued for order {} (user {})",
            order.id, order.user_id
        );
        Ok(())
    }
}

/// One state transition, two entry points: the payment-provider webhook
/// carries a payment result, the admin cash-on-delivery action carries
/// none. Both converge on the same atomic stock-decrement-and-mark-paid.
pub struct SettlementHandler {
    orders: Arc<dyn OrderStore>,
    receipts: Arc<dyn ReceiptSender>,
}

impl SettlementHandler {
    pub fn new(orders: Arc<dyn OrderStore>, receipts: Arc<dyn ReceiptSender>) -> Self {
        Self { orders, receipts }
    }

    /// Settle an order: decrement stock for every line item and timestamp
    /// it as paid, atomically. A duplicate call fails with `AlreadyPaid`
    /// and performs zero stock mutation.
    pub async fn settle(
        &self,
        order_id: ModelId,
        payment_result: Option<PaymentResult>,
    ) -> Result<()> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::NotFound("Order"))?;

        if order.is_paid {
            return Err(CheckoutError::AlreadyPaid);
        }

        // The store re-checks the paid flag inside its transaction, so a
        // concurrent settlement that slips past the check above still
        // loses there.
        self.orders
            .settle_order(order_id, payment_result, Utc::now())
            .await?;

        info!("Order {} settled", order_id);

        match self.orders.get_order(order_id).await? {
            Some(settled) => {
                if let Err(err) = self.receipts.send_purchase_receipt(&settled).await {
                    warn!("Failed to send receipt for order {}: {}", order_id, err);
                }
            }
            None => warn!("Order {} vanished after settlement", order_id),
        }

        Ok(())
    }

    /// Admin "mark as paid" for cash-on-delivery orders: same transition
    /// with an empty payment result, wrapped as an action boundary.
    pub async fn mark_paid_cod(&self, order_id: ModelId) -> Result<ActionResult> {
        into_action(
            self.settle(order_id, None)
                .await
                .map(|_| ActionResult::ok("Order marked as paid.")),
        )
    }
}
