use crate::{
    config::AppConfig,
    entities::{
        cart, cart_item, order, order_item, promo_usage, Cart, CartItem, OrderStatus,
        PaymentStatus, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    money,
    services::{
        inventory::{self, CartLineStatus},
        orders::OrderWithItems,
        promotions,
        shipping::{self, ShippingMethod},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Checkout orchestrator: the only writer of orders, order items and promo
/// usages.
///
/// `create_order_from_cart` is one failure-atomic unit of work. Stock and
/// promo state are re-validated inside the transaction (the earlier
/// cart-view and preview calls are advisory only), and every write rolls
/// back together if any step fails, so a failed checkout leaves the cart,
/// stock counters and promo usage exactly as they were.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Converts the user's cart into a locked order.
    #[instrument(skip(self, input))]
    pub async fn create_order_from_cart(
        &self,
        user_id: Uuid,
        input: CheckoutInput,
    ) -> Result<OrderWithItems, ServiceError> {
        let promo_code = input
            .promo_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty());

        let txn = self.db.begin().await?;

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::ValidationError("Cart is empty.".to_string()))?;

        let lines = inventory::statuses_for_cart(&txn, cart.id).await?;
        if lines.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty.".to_string()));
        }

        // Authoritative stock re-check, under the same transaction as the
        // order insert. The cart-view check cannot be trusted here.
        if lines.iter().any(|(_, status)| *status != CartLineStatus::Valid) {
            return Err(ServiceError::ValidationError(
                "Cart contains out-of-stock or unavailable items.".to_string(),
            ));
        }

        let subtotal_minor: i64 = lines.iter().map(|(item, _)| item.line_total_minor()).sum();

        // Shipping is resolved server-side; the client picks a method name,
        // nothing more.
        let method = ShippingMethod::normalize(input.shipping_method.as_deref());
        let quote = shipping::quote(method, Utc::now().date_naive());

        // Re-run the full promo validation inside the transaction. A code
        // that expired or hit its limit since the preview rejects the whole
        // checkout; a stale discount is never partially applied.
        let grant = match promo_code {
            Some(code) => {
                Some(promotions::validate_for_cart(&txn, user_id, subtotal_minor, code).await?)
            }
            None => None,
        };
        let discount_minor = grant.as_ref().map_or(0, |g| g.discount_minor);

        // Create the order with zero totals first to obtain its identity.
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order = order::ActiveModel {
            id: Set(order_id),
            public_id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            address_text: Set(input.address_text.clone()),
            status: Set(OrderStatus::Created),
            payment_status: Set(PaymentStatus::Pending),
            subtotal_minor: Set(0),
            discount_minor: Set(0),
            shipping_fee_minor: Set(quote.fee_minor),
            tax_minor: Set(0),
            total_minor: Set(0),
            total_weight_grams: Set(0),
            shipping_method: Set(quote.method.as_ref().to_string()),
            delivery_start: Set(quote.delivery_start),
            delivery_end: Set(quote.delivery_end),
            promo_code: Set(grant.as_ref().map(|g| g.promo.code.clone())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut pending_events = Vec::new();
        let mut frozen_subtotal = 0i64;
        let mut total_weight_grams = 0i64;
        let mut items = Vec::with_capacity(lines.len());

        for (item, _) in &lines {
            // Defensive re-check per line; the set was validated above but
            // each decrement below is still the final word on stock.
            let variant = ProductVariant::find_by_id(item.variant_id).one(&txn).await?;
            if inventory::line_status(item.quantity, variant.as_ref()) != CartLineStatus::Valid {
                return Err(ServiceError::ValidationError(format!(
                    "{} is no longer available.",
                    item.product_name
                )));
            }

            if self.config.decrement_stock_on_order {
                let taken = inventory::decrement_stock(&txn, item.variant_id, item.quantity).await?;
                if !taken {
                    return Err(ServiceError::Conflict(format!(
                        "{} was just bought out, please retry.",
                        item.product_name
                    )));
                }
                pending_events.push(Event::StockDecremented {
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                });
            }

            let snapshot = item.snapshot();
            let line_total_minor = item.line_total_minor();

            let frozen = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                variant_id: Set(item.variant_id),
                product_name: Set(snapshot.product_name),
                color: Set(snapshot.color),
                size: Set(snapshot.size),
                quantity: Set(item.quantity),
                weight_grams: Set(snapshot.weight_grams),
                unit_price_minor: Set(snapshot.unit_price_minor),
                line_total_minor: Set(line_total_minor),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            frozen_subtotal += line_total_minor;
            total_weight_grams += snapshot.weight_grams * i64::from(item.quantity);
            items.push(frozen);
        }

        // Subtotal is the sum of already-rounded line totals; discounting
        // clamps at zero, tax is rounded once on the discounted amount.
        let discounted = (frozen_subtotal - discount_minor).max(0);
        let tax_rate = Decimal::from_f64_retain(self.config.default_tax_rate)
            .unwrap_or(Decimal::ZERO);
        let tax_minor = money::tax_minor(discounted, tax_rate);
        let total_minor = discounted + quote.fee_minor + tax_minor;

        let mut locked: order::ActiveModel = order.into();
        locked.subtotal_minor = Set(frozen_subtotal);
        locked.discount_minor = Set(discount_minor);
        locked.tax_minor = Set(tax_minor);
        locked.total_minor = Set(total_minor);
        locked.total_weight_grams = Set(total_weight_grams);
        locked.updated_at = Set(Utc::now());
        let order = locked.update(&txn).await?;

        if let Some(grant) = &grant {
            let usage = promo_usage::ActiveModel {
                id: Set(Uuid::new_v4()),
                promo_id: Set(grant.promo.id),
                user_id: Set(user_id),
                order_id: Set(order_id),
                used_at: Set(Utc::now()),
            };
            // The unique index on (promo, user) closes the race between two
            // concurrent checkouts that both passed the pre-check.
            usage.insert(&txn).await.map_err(|err| {
                let err = ServiceError::from(err);
                if err.is_unique_violation() {
                    ServiceError::Conflict("Promo code is no longer available.".to_string())
                } else {
                    err
                }
            })?;
            pending_events.push(Event::PromoRedeemed {
                promo_id: grant.promo.id,
                user_id,
                order_id,
            });
        }

        // Clear the cart last; the cart row itself survives, empty.
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        pending_events.push(Event::CartCleared(cart.id));
        pending_events.push(Event::OrderCreated(order.id));
        for event in pending_events {
            self.event_sender.send_or_log(event).await;
        }

        info!(
            "Checkout complete: order {} ({} lines, {} kg, total {})",
            order.public_id,
            items.len(),
            money::kg(order.total_weight_grams),
            order.total_minor
        );
        Ok(OrderWithItems { order, items })
    }
}

/// Input for committing a checkout
#[derive(Debug, Deserialize)]
pub struct CheckoutInput {
    /// Free-text delivery address snapshot
    pub address_text: String,
    /// Client-selected method name; normalized server-side
    pub shipping_method: Option<String>,
    pub promo_code: Option<String>,
}
