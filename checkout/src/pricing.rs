use crate::model::CartItem;
use crate::money::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The four derived money fields of a cart, recomputed from its items on
/// every mutation and snapshotted into the order at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub items_price: Money,
    pub shipping_price: Money,
    pub tax_price: Money,
    pub total_price: Money,
}

impl CartTotals {
    pub fn zero() -> Self {
        Self {
            items_price: Money::zero(),
            shipping_price: Money::zero(),
            tax_price: Money::zero(),
            total_price: Money::zero(),
        }
    }
}

fn free_shipping_threshold() -> Decimal {
    Decimal::from(100)
}

fn flat_shipping() -> Money {
    Money::from_minor_units(10_00)
}

fn tax_rate() -> Decimal {
    // 15%
    Decimal::new(15, 2)
}

/// Derive item/shipping/tax/total prices from a cart's line items.
///
/// Shipping is free strictly above the threshold; a cart of exactly 100.00
/// still pays the flat rate. Tax is 15% of the item total, rounded
/// half-away-from-zero; the grand total is the exact sum of the three
/// parts, so no rounding drift can accumulate.
pub fn calc_price(items: &[CartItem]) -> CartTotals {
    let items_price: Money = items.iter().map(|item| item.price.times(item.qty)).sum();
    let items_price = Money::round2(items_price.amount());

    let shipping_price = if items_price.amount() > free_shipping_threshold() {
        Money::zero()
    } else {
        flat_shipping()
    };

    let tax_price = Money::round2(tax_rate() * items_price.amount());

    let total_price = items_price + shipping_price + tax_price;

    CartTotals {
        items_price,
        shipping_price,
        tax_price,
        total_price,
    }
}
