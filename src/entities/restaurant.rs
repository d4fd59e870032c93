//! Restaurant entity - A restaurant managed by one owner.
//!
//! Cuisine tags are a JSON list in `cuisines`; `core::restaurant` encodes and
//! decodes them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Restaurant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "restaurants")]
pub struct Model {
    /// Unique identifier for the restaurant
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning restaurant owner profile
    pub owner_id: i64,
    /// Restaurant name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Address or area
    pub location: String,
    /// JSON list of cuisine tags
    pub cuisines: String,
    /// File name under the upload directory
    pub image_path: Option<String>,
    /// When the restaurant was created
    pub created_at: DateTimeUtc,
    /// When the restaurant was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Restaurant and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each restaurant belongs to one owner
    #[sea_orm(
        belongs_to = "super::restaurant_owner::Entity",
        from = "Column::OwnerId",
        to = "super::restaurant_owner::Column::Id"
    )]
    Owner,
    /// One restaurant has many menu items
    #[sea_orm(has_many = "super::menu_item::Entity")]
    MenuItems,
    /// One restaurant has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::restaurant_owner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItems.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
