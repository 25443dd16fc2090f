//! Promo code validation and discount computation.
//!
//! Validation is pure: no usage record is ever written here, so the same
//! call backs both the live preview endpoint and the authoritative re-check
//! inside the checkout transaction. Checks run in a fixed order and the first
//! failure wins, so the user always sees one deterministic reason.

use crate::{
    entities::{promo_code, promo_usage, DiscountType, PromoCode, PromoCodeModel, PromoUsage},
    errors::ServiceError,
    money,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

/// Why a promo code was not accepted. Messages are user-facing verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromoRejection {
    #[error("Enter promo code.")]
    CodeRequired,
    #[error("Invalid promo code.")]
    InvalidCode,
    #[error("Promo inactive.")]
    Inactive,
    #[error("Promo not started yet.")]
    NotStarted,
    #[error("Promo expired.")]
    Expired,
    #[error("You already used this promo.")]
    AlreadyUsed,
    #[error("Promo usage limit reached.")]
    LimitReached,
    #[error("Minimum cart value is ₹{}", money::display_minor(*min_cart_value_minor))]
    BelowMinimum { min_cart_value_minor: i64 },
}

impl PromoRejection {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CodeRequired => "CODE_REQUIRED",
            Self::InvalidCode => "INVALID_CODE",
            Self::Inactive => "INACTIVE",
            Self::NotStarted => "NOT_STARTED",
            Self::Expired => "EXPIRED",
            Self::AlreadyUsed => "ALREADY_USED",
            Self::LimitReached => "LIMIT_REACHED",
            Self::BelowMinimum { .. } => "BELOW_MINIMUM",
        }
    }
}

/// The two mutually exclusive discount rules, decoded from a stored promo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountRule {
    Percent { value: i64, cap: i64 },
    Flat { value: i64 },
}

impl DiscountRule {
    /// Decodes a stored promo row, enforcing the cross-field rules the admin
    /// form promises: a percentage promo must carry a cap, a flat promo must
    /// not.
    pub fn from_promo(promo: &PromoCodeModel) -> Result<Self, ServiceError> {
        match promo.discount_type {
            DiscountType::Percent => {
                if promo.discount_value > 100 {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Promo {} has a percentage above 100",
                        promo.code
                    )));
                }
                let cap = promo.max_discount_minor.ok_or_else(|| {
                    ServiceError::InvalidOperation(format!(
                        "Promo {} is percentage-based but has no maximum discount amount",
                        promo.code
                    ))
                })?;
                Ok(Self::Percent {
                    value: promo.discount_value,
                    cap,
                })
            }
            DiscountType::Flat => {
                if promo.max_discount_minor.is_some() {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Promo {} is flat but carries a maximum discount amount",
                        promo.code
                    )));
                }
                Ok(Self::Flat {
                    value: promo.discount_value,
                })
            }
        }
    }

    /// Discount in minor units for a given cart subtotal. Flat discounts
    /// clamp to the subtotal so the payable total can never go negative;
    /// percentage discounts floor, then cap.
    pub fn discount_minor(&self, subtotal_minor: i64) -> i64 {
        match *self {
            Self::Flat { value } => value.min(subtotal_minor),
            Self::Percent { value, cap } => money::percent_of(subtotal_minor, value).min(cap),
        }
    }
}

/// A successfully validated promo and its computed discount.
#[derive(Debug, Clone, Serialize)]
pub struct PromoGrant {
    pub promo: PromoCodeModel,
    pub discount_minor: i64,
}

/// Validates a promo code against a user and cart subtotal.
///
/// Read-only on any connection; checkout re-runs this inside its transaction
/// to close the preview-to-commit window. Check order (first failure wins):
/// code present, code exists, active, date window, per-user redemption,
/// global usage limit, minimum cart value.
pub async fn validate_for_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    cart_subtotal_minor: i64,
    raw_code: &str,
) -> Result<PromoGrant, ServiceError> {
    let code = raw_code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ServiceError::PromoRejected(PromoRejection::CodeRequired));
    }

    let promo = PromoCode::find()
        .filter(promo_code::Column::Code.eq(code))
        .one(conn)
        .await?
        .ok_or(ServiceError::PromoRejected(PromoRejection::InvalidCode))?;

    let now = Utc::now();

    if !promo.is_active {
        return Err(ServiceError::PromoRejected(PromoRejection::Inactive));
    }

    if now < promo.valid_from {
        return Err(ServiceError::PromoRejected(PromoRejection::NotStarted));
    }

    if now > promo.valid_to {
        return Err(ServiceError::PromoRejected(PromoRejection::Expired));
    }

    // One redemption per user per code, ever. Hard business rule, not
    // configurable per promo.
    let already_used = PromoUsage::find()
        .filter(promo_usage::Column::PromoId.eq(promo.id))
        .filter(promo_usage::Column::UserId.eq(user_id))
        .count(conn)
        .await?
        > 0;
    if already_used {
        return Err(ServiceError::PromoRejected(PromoRejection::AlreadyUsed));
    }

    // None and 0 both mean unlimited.
    if let Some(limit) = promo.usage_limit_total.filter(|limit| *limit > 0) {
        let used = PromoUsage::find()
            .filter(promo_usage::Column::PromoId.eq(promo.id))
            .count(conn)
            .await?;
        if used >= limit as u64 {
            return Err(ServiceError::PromoRejected(PromoRejection::LimitReached));
        }
    }

    if cart_subtotal_minor < promo.min_cart_value_minor {
        return Err(ServiceError::PromoRejected(PromoRejection::BelowMinimum {
            min_cart_value_minor: promo.min_cart_value_minor,
        }));
    }

    let rule = DiscountRule::from_promo(&promo)?;
    let discount_minor = rule.discount_minor(cart_subtotal_minor);

    Ok(PromoGrant {
        promo,
        discount_minor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(discount_type: DiscountType, value: i64, cap: Option<i64>) -> PromoCodeModel {
        let now = Utc::now();
        PromoCodeModel {
            id: Uuid::new_v4(),
            code: "TEST".to_string(),
            discount_type,
            discount_value: value,
            min_cart_value_minor: 0,
            max_discount_minor: cap,
            usage_limit_total: None,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn flat_discount_clamps_to_subtotal() {
        let rule = DiscountRule::from_promo(&promo(DiscountType::Flat, 5000, None)).unwrap();
        assert_eq!(rule.discount_minor(90000), 5000);
        assert_eq!(rule.discount_minor(3000), 3000);
        assert_eq!(rule.discount_minor(0), 0);
    }

    #[test]
    fn percent_discount_floors_then_caps() {
        // 10% of 300000 = 30000 raw, capped at 20000
        let rule =
            DiscountRule::from_promo(&promo(DiscountType::Percent, 10, Some(20000))).unwrap();
        assert_eq!(rule.discount_minor(300000), 20000);
        // Below the cap the floored share applies: 10% of 999 floors to 99
        assert_eq!(rule.discount_minor(999), 99);
    }

    #[test]
    fn percent_requires_cap() {
        let err = DiscountRule::from_promo(&promo(DiscountType::Percent, 10, None)).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }

    #[test]
    fn flat_forbids_cap() {
        let err =
            DiscountRule::from_promo(&promo(DiscountType::Flat, 5000, Some(1000))).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }

    #[test]
    fn percent_above_hundred_rejected() {
        let err =
            DiscountRule::from_promo(&promo(DiscountType::Percent, 150, Some(1000))).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }

    #[test]
    fn rejection_codes_are_stable() {
        assert_eq!(PromoRejection::CodeRequired.code(), "CODE_REQUIRED");
        assert_eq!(PromoRejection::AlreadyUsed.code(), "ALREADY_USED");
        assert_eq!(
            PromoRejection::BelowMinimum {
                min_cart_value_minor: 50000
            }
            .code(),
            "BELOW_MINIMUM"
        );
    }

    #[test]
    fn below_minimum_message_shows_rupees() {
        let msg = PromoRejection::BelowMinimum {
            min_cart_value_minor: 50000,
        }
        .to_string();
        assert_eq!(msg, "Minimum cart value is ₹500.00");
    }
}
