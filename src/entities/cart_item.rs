use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cart line item.
///
/// References its variant by id for live availability checks, but carries a
/// frozen snapshot of everything the user saw when the line was added:
/// catalog edits after that point must never silently change the cart.
/// At most one line per (cart, variant); re-adding increments the quantity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cart_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    // -------- snapshot fields, frozen at add time --------
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub weight_grams: i64,
    pub price_per_kg_minor: i64,
    pub unit_price_minor: i64,
    // -----------------------------------------------------
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::CartId",
        to = "super::cart::Column::Id"
    )]
    Cart,
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    ProductVariant,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVariant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The immutable per-unit snapshot a cart line carries. Order items freeze a
/// copy of exactly this, so an order survives any later catalog edit or
/// variant deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub weight_grams: i64,
    pub price_per_kg_minor: i64,
    pub unit_price_minor: i64,
}

impl Model {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            product_name: self.product_name.clone(),
            color: self.color.clone(),
            size: self.size.clone(),
            weight_grams: self.weight_grams,
            price_per_kg_minor: self.price_per_kg_minor,
            unit_price_minor: self.unit_price_minor,
        }
    }

    /// Line total in minor units; exact integer product of the already
    /// rounded unit price.
    pub fn line_total_minor(&self) -> i64 {
        crate::money::line_total_minor(self.unit_price_minor, self.quantity)
    }
}
