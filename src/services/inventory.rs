//! Inventory gate: live purchasability checks and atomic stock mutation.
//!
//! Everything here is generic over `ConnectionTrait` so the same checks run
//! against the pool at cart-view time and against the checkout transaction at
//! commit time. The two calls are not interchangeable (stock can change in
//! between), so the transactional call is always the authoritative one.

use crate::{
    entities::{cart_item, product_variant, CartItem, ProductVariant},
    errors::ServiceError,
};
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use uuid::Uuid;

/// Purchasability of a single cart line against live catalog state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartLineStatus {
    Valid,
    OutOfStock,
    InsufficientStock,
    Disabled,
}

/// Classifies one line. A deleted variant counts as disabled: the reference
/// is dangling, so the line can never be purchased.
pub fn line_status(quantity: i32, variant: Option<&product_variant::Model>) -> CartLineStatus {
    let Some(variant) = variant else {
        return CartLineStatus::Disabled;
    };

    if !variant.is_active {
        return CartLineStatus::Disabled;
    }

    if variant.stock == 0 {
        return CartLineStatus::OutOfStock;
    }

    if quantity > variant.stock {
        return CartLineStatus::InsufficientStock;
    }

    CartLineStatus::Valid
}

/// Loads a cart's lines with their live status, oldest line first.
pub async fn statuses_for_cart<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<Vec<(cart_item::Model, CartLineStatus)>, ServiceError> {
    let rows = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .find_also_related(ProductVariant)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(item, variant)| {
            let status = line_status(item.quantity, variant.as_ref());
            (item, status)
        })
        .collect())
}

/// True iff every line in the cart is currently purchasable.
pub async fn cart_is_checkoutable<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<bool, ServiceError> {
    let lines = statuses_for_cart(conn, cart_id).await?;
    Ok(lines
        .iter()
        .all(|(_, status)| *status == CartLineStatus::Valid))
}

/// Atomically takes `quantity` units off a variant's stock.
///
/// Compare-and-decrement in a single statement, `stock = stock - n WHERE
/// stock >= n`, with the affected-row count as the verdict. Never
/// read-decide-write: two checkouts racing for the last unit must serialize
/// here, and stock can never go negative.
pub async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    variant_id: Uuid,
    quantity: i32,
) -> Result<bool, ServiceError> {
    let result = ProductVariant::update_many()
        .col_expr(
            product_variant::Column::Stock,
            Expr::col(product_variant::Column::Stock).sub(quantity),
        )
        .filter(product_variant::Column::Id.eq(variant_id))
        .filter(product_variant::Column::Stock.gte(quantity))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Returns units to a variant's stock (order cancellation).
pub async fn restock<C: ConnectionTrait>(
    conn: &C,
    variant_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    ProductVariant::update_many()
        .col_expr(
            product_variant::Column::Stock,
            Expr::col(product_variant::Column::Stock).add(quantity),
        )
        .filter(product_variant::Column::Id.eq(variant_id))
        .exec(conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn variant(stock: i32, is_active: bool) -> product_variant::Model {
        product_variant::Model {
            id: Uuid::new_v4(),
            product_name: "Steel Sheet".to_string(),
            color: "Grey".to_string(),
            size: "M".to_string(),
            weight_grams: 1500,
            price_per_kg_minor: 30000,
            stock,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn disabled_wins_over_stock() {
        let v = variant(0, false);
        assert_eq!(line_status(1, Some(&v)), CartLineStatus::Disabled);
    }

    #[test]
    fn missing_variant_is_disabled() {
        assert_eq!(line_status(1, None), CartLineStatus::Disabled);
    }

    #[test]
    fn zero_stock_is_out_of_stock() {
        let v = variant(0, true);
        assert_eq!(line_status(1, Some(&v)), CartLineStatus::OutOfStock);
    }

    #[test]
    fn partial_availability_is_insufficient() {
        let v = variant(2, true);
        assert_eq!(line_status(3, Some(&v)), CartLineStatus::InsufficientStock);
    }

    #[test]
    fn quantity_within_stock_is_valid() {
        let v = variant(2, true);
        assert_eq!(line_status(2, Some(&v)), CartLineStatus::Valid);
        assert_eq!(line_status(1, Some(&v)), CartLineStatus::Valid);
    }
}
