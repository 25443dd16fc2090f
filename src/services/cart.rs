use crate::{
    entities::{cart, cart_item, Cart, CartItem, CartItemModel, CartModel, ProductVariant},
    errors::ServiceError,
    events::{Event, EventSender},
    money,
    services::inventory::{self, CartLineStatus},
};
use chrono::Utc;
use sea_orm::error::SqlErr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Shopping cart service.
///
/// Owns every cart mutation: lazy per-user cart creation, adding lines with
/// price/weight snapshots, quantity updates bounded by live stock, and the
/// cart view with per-line availability. Cart operations never touch another
/// user's cart and never touch promo counters.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Fetches the user's cart, creating it on first use.
    pub async fn get_or_create_cart(&self, user_id: Uuid) -> Result<CartModel, ServiceError> {
        find_or_create_cart(&*self.db, user_id).await
    }

    /// Adds a variant to the user's cart.
    ///
    /// If a line for the variant already exists its quantity is incremented;
    /// otherwise a new line is created with a snapshot of the variant's
    /// name, color, size, weight and per-kg price taken now. Either way the
    /// resulting quantity is bounded by live stock.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddItemInput,
    ) -> Result<CartItemModel, ServiceError> {
        let quantity = input.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart = find_or_create_cart(&txn, user_id).await?;

        let variant = ProductVariant::find_by_id(input.variant_id)
            .one(&txn)
            .await?
            .filter(|v| v.is_active)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} not found", input.variant_id))
            })?;

        if variant.stock < 1 {
            return Err(ServiceError::InsufficientStock(
                "This item is out of stock".to_string(),
            ));
        }

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::VariantId.eq(input.variant_id))
            .one(&txn)
            .await?;

        let item = match existing {
            Some(item) => {
                let new_quantity = item.quantity + quantity;
                if new_quantity > variant.stock {
                    return Err(ServiceError::InsufficientStock(format!(
                        "Only {} pieces available",
                        variant.stock
                    )));
                }
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(new_quantity);
                active.update(&txn).await?
            }
            None => {
                if quantity > variant.stock {
                    return Err(ServiceError::InsufficientStock(format!(
                        "Only {} pieces available",
                        variant.stock
                    )));
                }
                let unit_price_minor =
                    money::unit_price_minor(variant.weight_grams, variant.price_per_kg_minor);

                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    variant_id: Set(variant.id),
                    quantity: Set(quantity),
                    product_name: Set(variant.product_name.clone()),
                    color: Set(variant.color.clone()),
                    size: Set(variant.size.clone()),
                    weight_grams: Set(variant.weight_grams),
                    price_per_kg_minor: Set(variant.price_per_kg_minor),
                    unit_price_minor: Set(unit_price_minor),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?
            }
        };

        touch_cart(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: item.cart_id,
                variant_id: item.variant_id,
            })
            .await;

        info!(
            "Added variant {} x{} to cart {}",
            item.variant_id, quantity, item.cart_id
        );
        Ok(item)
    }

    /// Replaces a line's quantity. Rejected below 1 and beyond live stock.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        new_quantity: i32,
    ) -> Result<CartItemModel, ServiceError> {
        if new_quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Minimum quantity is 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart = cart_for_user(&txn, user_id).await?;
        let item = CartItem::find_by_id(item_id)
            .filter(cart_item::Column::CartId.eq(cart.id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let variant = ProductVariant::find_by_id(item.variant_id).one(&txn).await?;
        let variant = variant.filter(|v| v.is_active).ok_or_else(|| {
            ServiceError::ValidationError(format!("{} is no longer available.", item.product_name))
        })?;

        if new_quantity > variant.stock {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} pieces available",
                variant.stock
            )));
        }

        let mut active: cart_item::ActiveModel = item.into();
        active.quantity = Set(new_quantity);
        let item = active.update(&txn).await?;

        touch_cart(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: item.cart_id,
                item_id: item.id,
            })
            .await;

        Ok(item)
    }

    /// Removes a line from the user's cart.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let cart = cart_for_user(&*self.db, user_id).await?;

        let result = CartItem::delete_many()
            .filter(cart_item::Column::Id.eq(item_id))
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Cart item {} not found",
                item_id
            )));
        }

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                item_id,
            })
            .await;

        Ok(())
    }

    /// The cart as the storefront shows it: every line with its live
    /// availability status, derived totals, and whether checkout may begin.
    /// Snapshots stay frozen; only availability is evaluated live.
    #[instrument(skip(self))]
    pub async fn get_cart_view(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let Some(cart) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        else {
            return Ok(CartView::empty());
        };

        let lines = inventory::statuses_for_cart(&*self.db, cart.id).await?;

        let mut subtotal_minor = 0i64;
        let mut checkout_allowed = !lines.is_empty();
        let items = lines
            .into_iter()
            .map(|(item, status)| {
                let line_total_minor = item.line_total_minor();
                subtotal_minor += line_total_minor;
                if status != CartLineStatus::Valid {
                    checkout_allowed = false;
                }
                CartLineView {
                    item,
                    status,
                    line_total_minor,
                }
            })
            .collect();

        Ok(CartView {
            cart_id: Some(cart.id),
            items,
            subtotal_minor,
            // Extension point for cart-level shipping/tax preview; checkout
            // computes the canonical totals and the two must agree.
            total_minor: subtotal_minor,
            checkout_allowed,
        })
    }
}

/// Finds the user's cart or lazily creates it. A concurrent first-add from
/// another tab can race the insert; the unique index on user_id decides, and
/// the loser adopts the winner's row.
async fn find_or_create_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<CartModel, ServiceError> {
    if let Some(existing) = Cart::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let fresh = cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    };

    match fresh.insert(conn).await {
        Ok(cart) => Ok(cart),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Cart::find()
                .filter(cart::Column::UserId.eq(user_id))
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!("Cart for user {} vanished", user_id))
                })
        }
        Err(err) => Err(err.into()),
    }
}

async fn cart_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<CartModel, ServiceError> {
    Cart::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Cart for user {} not found", user_id)))
}

async fn touch_cart<C: ConnectionTrait>(conn: &C, cart: CartModel) -> Result<(), ServiceError> {
    let mut active: cart::ActiveModel = cart.into();
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;
    Ok(())
}

/// Input for adding an item to the cart
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub variant_id: Uuid,
    /// Defaults to 1, the storefront's add-to-cart button
    pub quantity: Option<i32>,
}

/// One cart line with its live availability
#[derive(Debug, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub item: CartItemModel,
    pub status: CartLineStatus,
    pub line_total_minor: i64,
}

/// The cart as rendered by the storefront
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart_id: Option<Uuid>,
    pub items: Vec<CartLineView>,
    pub subtotal_minor: i64,
    pub total_minor: i64,
    pub checkout_allowed: bool,
}

impl CartView {
    fn empty() -> Self {
        Self {
            cart_id: None,
            items: Vec::new(),
            subtotal_minor: 0,
            total_minor: 0,
            checkout_allowed: false,
        }
    }
}
