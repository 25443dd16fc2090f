use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product variant: the catalog's interface surface to the checkout engine.
///
/// Catalog CRUD lives with an external collaborator; this row carries the
/// fields the engine reads live (stock, active flag) and the fields it
/// snapshots into cart lines (name, color, size, weight, per-kg rate).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_name: String,
    pub color: String,
    pub size: String,
    /// Unit weight in grams (kg with 3 implied decimals)
    pub weight_grams: i64,
    /// Subcategory per-kilogram rate in minor currency units
    pub price_per_kg_minor: i64,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
