//! Shipping resolution. The method string comes from the client but is
//! normalized server-side; fees and delivery windows are fixed here and a
//! client-supplied fee is never trusted.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Flat express surcharge in minor units (Rs 99.00).
pub const EXPRESS_FEE_MINOR: i64 = 9900;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, Default,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
}

impl ShippingMethod {
    /// Normalizes raw client input. Anything that is not recognizably
    /// "express" ships standard, matching the storefront's historic behavior.
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse().ok()).unwrap_or_default()
    }
}

/// A resolved shipping option: fee plus a concrete delivery window.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingQuote {
    pub method: ShippingMethod,
    pub fee_minor: i64,
    pub min_days: i64,
    pub max_days: i64,
    pub delivery_start: NaiveDate,
    pub delivery_end: NaiveDate,
}

/// Resolves fee and delivery window for a method as of `today`.
pub fn quote(method: ShippingMethod, today: NaiveDate) -> ShippingQuote {
    let (fee_minor, min_days, max_days) = match method {
        ShippingMethod::Express => (EXPRESS_FEE_MINOR, 4, 5),
        ShippingMethod::Standard => (0, 7, 8),
    };

    ShippingQuote {
        method,
        fee_minor,
        min_days,
        max_days,
        delivery_start: today + Duration::days(min_days),
        delivery_end: today + Duration::days(max_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_client_input() {
        assert_eq!(
            ShippingMethod::normalize(Some("express")),
            ShippingMethod::Express
        );
        assert_eq!(
            ShippingMethod::normalize(Some("EXPRESS")),
            ShippingMethod::Express
        );
        assert_eq!(
            ShippingMethod::normalize(Some(" express ")),
            ShippingMethod::Express
        );
        assert_eq!(
            ShippingMethod::normalize(Some("standard")),
            ShippingMethod::Standard
        );
        assert_eq!(
            ShippingMethod::normalize(Some("overnight")),
            ShippingMethod::Standard
        );
        assert_eq!(ShippingMethod::normalize(None), ShippingMethod::Standard);
    }

    #[test]
    fn express_quote() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let q = quote(ShippingMethod::Express, today);
        assert_eq!(q.fee_minor, 9900);
        assert_eq!(q.delivery_start, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(q.delivery_end, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
    }

    #[test]
    fn standard_ships_free() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let q = quote(ShippingMethod::Standard, today);
        assert_eq!(q.fee_minor, 0);
        assert_eq!(q.min_days, 7);
        assert_eq!(q.max_days, 8);
    }

    #[test]
    fn stored_method_string_is_lowercase() {
        assert_eq!(ShippingMethod::Express.as_ref(), "express");
        assert_eq!(ShippingMethod::Standard.as_ref(), "standard");
    }
}
