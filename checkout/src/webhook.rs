use crate::error::{CheckoutError, Result};
use crate::model::{ModelId, PaymentResult};
use crate::money::Money;
use crate::settlement::SettlementHandler;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook before it is rejected as a replay.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a Stripe-style signature header (`t=<unix>,v1=<hex hmac>`).
///
/// The HMAC-SHA256 is computed over `"{t}.{payload}"` with the shared
/// webhook secret. A malformed header, a stale timestamp, or a digest
/// mismatch all verify as false; none of them is an error.
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &str) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<&str> = None;
    for part in signature_header.split(',') {
        if let Some(value) = part.trim().strip_prefix("t=") {
            timestamp = value.parse().ok();
        } else if let Some(value) = part.trim().strip_prefix("v1=") {
            signature = Some(value);
        }
    }
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return false;
    };

    if (Utc::now().timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.verify_slice(&signature_bytes).is_ok()
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: StripeCharge,
}

#[derive(Debug, Deserialize)]
pub struct StripeCharge {
    pub id: String,
    /// Amount in the provider's minor units (cents).
    pub amount: i64,
    #[serde(default)]
    pub billing_details: BillingDetails,
    pub metadata: ChargeMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct BillingDetails {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChargeMetadata {
    #[serde(rename = "orderId")]
    pub order_id: String,
}

/// Outcome reported back to the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAck {
    /// The referenced order was settled.
    Settled { order_id: ModelId },
    /// Event type we do not act on; acknowledged as a no-op.
    Ignored { event_type: String },
}

/// Inbound payment-notification endpoint logic: verify, parse, and on a
/// successful charge hand the embedded order over to settlement.
pub struct WebhookHandler {
    secret: String,
    settlement: Arc<SettlementHandler>,
}

impl WebhookHandler {
    pub fn new(secret: impl Into<String>, settlement: Arc<SettlementHandler>) -> Self {
        Self {
            secret: secret.into(),
            settlement,
        }
    }

    pub async fn handle(&self, payload: &[u8], signature_header: &str) -> Result<WebhookAck> {
        if !verify_signature(payload, signature_header, &self.secret) {
            return Err(CheckoutError::Validation(
                "Invalid webhook signature".to_string(),
            ));
        }

        let event: StripeEvent = serde_json::from_slice(payload).map_err(|err| {
            CheckoutError::Validation(format!("Malformed webhook payload: {err}"))
        })?;

        if event.event_type != "charge.succeeded" {
            debug!("Ignoring webhook event type {}", event.event_type);
            return Ok(WebhookAck::Ignored {
                event_type: event.event_type,
            });
        }

        let charge = event.data.object;
        let order_id: ModelId = charge.metadata.order_id.parse().map_err(|_| {
            CheckoutError::Validation(format!(
                "Invalid order id in charge metadata: {}",
                charge.metadata.order_id
            ))
        })?;

        if charge.amount <= 0 {
            return Err(CheckoutError::Validation(format!(
                "Invalid charge amount: {}",
                charge.amount
            )));
        }

        let payment_result = PaymentResult {
            id: charge.id,
            status: "COMPLETED".to_string(),
            email_address: charge.billing_details.email.unwrap_or_default(),
            price_paid: Money::from_minor_units(charge.amount),
            update_time: Utc::now(),
        };

        self.settlement.settle(order_id, Some(payment_result)).await?;
        info!("Webhook settled order {}", order_id);

        Ok(WebhookAck::Settled { order_id })
    }
}
