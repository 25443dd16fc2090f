use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Admin-managed discount definition.
///
/// `discount_value` is minor units for FLAT codes and an integer percentage
/// for PERCENT codes. `max_discount_minor` is required for PERCENT and
/// forbidden for FLAT. `usage_limit_total` of NULL means unlimited; the
/// per-user limit is always exactly one redemption, ever, and is enforced by
/// the unique index on promo_usages rather than a column here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promo_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Stored upper-cased; lookups normalize the same way
    #[sea_orm(unique)]
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_cart_value_minor: i64,
    #[sea_orm(nullable)]
    pub max_discount_minor: Option<i64>,
    #[sea_orm(nullable)]
    pub usage_limit_total: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::promo_usage::Entity")]
    Usages,
}

impl Related<super::promo_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum DiscountType {
    #[sea_orm(string_value = "PERCENT")]
    Percent,
    #[sea_orm(string_value = "FLAT")]
    Flat,
}
