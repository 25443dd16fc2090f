//! Money and weight arithmetic for the checkout engine.
//!
//! All persisted currency values are `i64` minor units (paise); all persisted
//! weights are `i64` grams. Decimals only ever appear as transient
//! intermediates and are rounded exactly once, at the point a value becomes
//! persistable.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Grams per kilogram, the implied scale of every stored weight.
pub const GRAMS_PER_KG: i64 = 1000;

/// Rounds a decimal amount of minor units to an integer, half away from zero.
pub fn round_to_minor(amount: Decimal) -> i64 {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

/// Derives a per-unit price in minor units from a variant's weight and its
/// subcategory per-kilogram rate. Rounded once, here, so every later line
/// total is an exact integer product.
pub fn unit_price_minor(weight_grams: i64, price_per_kg_minor: i64) -> i64 {
    let raw = Decimal::from(weight_grams) * Decimal::from(price_per_kg_minor)
        / Decimal::from(GRAMS_PER_KG);
    round_to_minor(raw)
}

/// Line total for a frozen order/cart line. Integer product, no rounding
/// needed: the unit price was rounded when it was snapshotted.
pub fn line_total_minor(unit_price_minor: i64, quantity: i32) -> i64 {
    unit_price_minor * i64::from(quantity)
}

/// Integer-percent share of a subtotal, floored (the promo computation rule).
pub fn percent_of(subtotal_minor: i64, percent: i64) -> i64 {
    subtotal_minor * percent / 100
}

/// Applies a tax rate to an already-discounted subtotal, rounding once.
pub fn tax_minor(discounted_subtotal_minor: i64, tax_rate: Decimal) -> i64 {
    round_to_minor(Decimal::from(discounted_subtotal_minor) * tax_rate)
}

/// Presentation helper: grams as a kilograms decimal with 3 places.
pub fn kg(weight_grams: i64) -> Decimal {
    Decimal::new(weight_grams, 3)
}

/// Presentation helper: minor units as a currency decimal with 2 places.
pub fn display_minor(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
