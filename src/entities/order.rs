use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order: created exactly once per checkout, immutable afterwards except for
/// status transitions. Address and totals are denormalized snapshots; the
/// `public_id` is the only identifier ever shared outside the service.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub public_id: Uuid,
    pub user_id: Uuid,
    /// Snapshot of the delivery address at order time (never an FK)
    pub address_text: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub shipping_fee_minor: i64,
    pub tax_minor: i64,
    pub total_minor: i64,
    pub total_weight_grams: i64,
    pub shipping_method: String,
    pub delivery_start: NaiveDate,
    pub delivery_end: NaiveDate,
    #[sea_orm(nullable)]
    pub promo_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order lifecycle states.
///
/// `created -> pending_payment -> paid`, with side branches
/// `created|pending_payment -> cancelled` and `paid -> refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "pending_payment")]
    PendingPayment,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, PendingPayment)
                | (PendingPayment, Paid)
                | (Created, Cancelled)
                | (PendingPayment, Cancelled)
                | (Paid, Refunded)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn forward_transitions() {
        assert!(Created.can_transition_to(PendingPayment));
        assert!(PendingPayment.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Refunded));
    }

    #[test]
    fn cancellation_branch() {
        assert!(Created.can_transition_to(Cancelled));
        assert!(PendingPayment.can_transition_to(Cancelled));
        assert!(!Paid.can_transition_to(Cancelled));
    }

    #[test]
    fn illegal_transitions() {
        assert!(!Created.can_transition_to(Paid));
        assert!(!Cancelled.can_transition_to(PendingPayment));
        assert!(!Refunded.can_transition_to(Paid));
        assert!(!Created.can_transition_to(Created));
    }
}
