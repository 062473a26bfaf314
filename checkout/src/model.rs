use crate::error::CheckoutError;
use crate::money::Money;
use crate::pricing::CartTotals;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ModelId = i64;

/// Key into the cart store. An anonymous visitor is identified by the
/// cookie-carried session cart id; sign-in re-attaches the same cart under
/// the user id. The two keys are mutually substitutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartOwner {
    Session(String),
    User(ModelId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ModelId,
    pub name: String,
    pub slug: String,
    pub price: Money,
    pub stock: i32,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ModelId,
    pub name: String,
    pub slug: String,
    pub price: Money,
    pub qty: u32,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub owner: CartOwner,
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

impl Cart {
    pub fn new(owner: CartOwner) -> Self {
        Self {
            owner,
            items: Vec::new(),
            totals: CartTotals::zero(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Derived money fields are never stored stale: every mutation path
    /// calls this before the cart is persisted. An empty cart has zero
    /// totals; the shipping charge only exists once there is something to
    /// ship.
    pub fn recompute_totals(&mut self) {
        self.totals = if self.items.is_empty() {
            crate::pricing::CartTotals::zero()
        } else {
            crate::pricing::calc_price(&self.items)
        };
    }

    /// Conversion into an order leaves an empty cart behind, it does not
    /// delete the row.
    pub fn clear(&mut self) {
        self.items.clear();
        self.totals = CartTotals::zero();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub street_address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    PayPal,
    Stripe,
    CashOnDelivery,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::Stripe => "Stripe",
            PaymentMethod::CashOnDelivery => "CashOnDelivery",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PaymentMethod {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PayPal" => Ok(PaymentMethod::PayPal),
            "Stripe" => Ok(PaymentMethod::Stripe),
            "CashOnDelivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(CheckoutError::Validation(format!(
                "Invalid payment method: {other}"
            ))),
        }
    }
}

/// External processor's proof-of-payment snapshot attached to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    pub email_address: String,
    pub price_paid: Money,
    pub update_time: DateTime<Utc>,
}

/// User profile collaborator: the assembler only reads the saved address
/// and payment method from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: ModelId,
    pub name: String,
    pub email: String,
    pub address: Option<ShippingAddress>,
    pub payment_method: Option<PaymentMethod>,
}

/// Order draft produced by the assembler, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: ModelId,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub totals: CartTotals,
}

/// Snapshot of a cart line at order-creation time, decoupled from live
/// product state so historical orders survive price changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ModelId,
    pub name: String,
    pub slug: String,
    pub price: Money,
    pub qty: u32,
    pub image: String,
}

impl From<CartItem> for OrderItem {
    fn from(item: CartItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name,
            slug: item.slug,
            price: item.price,
            qty: item.qty,
            image: item.image,
        }
    }
}

/// A placed order. Immutable except for the monotonic paid/delivered
/// transitions: `unpaid -> paid -> delivered`, never backwards, and never
/// `unpaid -> delivered` directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: ModelId,
    pub user_id: ModelId,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub totals: CartTotals,
    pub items: Vec<OrderItem>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentResult>,
    pub created_at: DateTime<Utc>,
}

/// Structured outcome of a public action boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect_to: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            redirect_to: None,
        }
    }

    pub fn with_redirect(mut self, to: impl Into<String>) -> Self {
        self.redirect_to = Some(to.into());
        self
    }
}

/// Outcome of `place_order`, carrying the new order id on success and the
/// suggested next navigation step either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderOutcome {
    pub success: bool,
    pub message: String,
    pub redirect_to: Option<String>,
    pub order_id: Option<ModelId>,
}

impl PlaceOrderOutcome {
    pub fn ok(order_id: ModelId) -> Self {
        Self {
            success: true,
            message: "Order created successfully".to_string(),
            redirect_to: Some(format!("/order/{order_id}")),
            order_id: Some(order_id),
        }
    }

    pub fn fail(message: impl Into<String>, redirect_to: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            redirect_to: Some(redirect_to.into()),
            order_id: None,
        }
    }
}

/// One page of results plus the total page count for pagination controls.
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub total_pages: u32,
}

/// Admin dashboard counters.
#[derive(Debug, Clone, Serialize)]
pub struct SalesSummary {
    pub orders_count: u64,
    pub products_count: u64,
    pub users_count: u64,
    pub total_sales: Money,
}
