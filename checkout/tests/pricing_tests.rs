mod fixtures;

use checkout::pricing::calc_price;
use fixtures::{cart_item, product};

#[test]
fn shipping_is_flat_at_exactly_one_hundred() {
    // The free-shipping boundary is exclusive: 100.00 still pays.
    let widget = product(1, "Widget", "50.00", 10);
    let totals = calc_price(&[cart_item(&widget, 2)]);

    assert_eq!(totals.items_price.to_string(), "100.00");
    assert_eq!(totals.shipping_price.to_string(), "10.00");
}

#[test]
fn shipping_is_free_one_cent_over_the_threshold() {
    let widget = product(1, "Widget", "100.01", 10);
    let totals = calc_price(&[cart_item(&widget, 1)]);

    assert_eq!(totals.items_price.to_string(), "100.01");
    assert_eq!(totals.shipping_price.to_string(), "0.00");
}

#[test]
fn high_value_cart_scenario() {
    // 60.00 x 2 -> 120.00 items, free shipping, 18.00 tax, 138.00 total.
    let jacket = product(1, "Jacket", "60.00", 5);
    let totals = calc_price(&[cart_item(&jacket, 2)]);

    assert_eq!(totals.items_price.to_string(), "120.00");
    assert_eq!(totals.shipping_price.to_string(), "0.00");
    assert_eq!(totals.tax_price.to_string(), "18.00");
    assert_eq!(totals.total_price.to_string(), "138.00");
}

#[test]
fn low_value_cart_scenario() {
    // 30.00 x 1 -> 30.00 items, 10.00 shipping, 4.50 tax, 44.50 total.
    let shirt = product(1, "Shirt", "30.00", 5);
    let totals = calc_price(&[cart_item(&shirt, 1)]);

    assert_eq!(totals.items_price.to_string(), "30.00");
    assert_eq!(totals.shipping_price.to_string(), "10.00");
    assert_eq!(totals.tax_price.to_string(), "4.50");
    assert_eq!(totals.total_price.to_string(), "44.50");
}

#[test]
fn tax_rounds_half_away_from_zero() {
    // 33.33 x 3 = 99.99 items; 15% of that is 14.9985 -> 15.00.
    let sticker = product(1, "Sticker", "33.33", 10);
    let totals = calc_price(&[cart_item(&sticker, 3)]);

    assert_eq!(totals.items_price.to_string(), "99.99");
    assert_eq!(totals.tax_price.to_string(), "15.00");
    assert_eq!(totals.total_price.to_string(), "124.99");
}

#[test]
fn total_is_the_exact_sum_of_its_parts() {
    let cheap = product(1, "Pin", "0.03", 100);
    let totals = calc_price(&[cart_item(&cheap, 1)]);

    // 15% of 0.03 is 0.0045, which rounds down to 0.00.
    assert_eq!(totals.items_price.to_string(), "0.03");
    assert_eq!(totals.shipping_price.to_string(), "10.00");
    assert_eq!(totals.tax_price.to_string(), "0.00");

    let sum = totals.items_price + totals.shipping_price + totals.tax_price;
    assert_eq!(totals.total_price, sum);
    assert_eq!(totals.total_price.to_string(), "10.03");
}

#[test]
fn mixed_cart_sums_line_totals() {
    let a = product(1, "Alpha", "19.99", 10);
    let b = product(2, "Beta", "5.25", 10);
    let totals = calc_price(&[cart_item(&a, 2), cart_item(&b, 3)]);

    // 39.98 + 15.75 = 55.73
    assert_eq!(totals.items_price.to_string(), "55.73");
    assert_eq!(totals.shipping_price.to_string(), "10.00");
    // 15% of 55.73 = 8.3595 -> 8.36
    assert_eq!(totals.tax_price.to_string(), "8.36");
    assert_eq!(totals.total_price.to_string(), "74.09");
}
