//! Menu item entity - A dish offered by one restaurant.
//!
//! Besides the catalog fields, each item keeps a per-day order counter
//! (`times_ordered_today`) that is reset lazily whenever `last_order_date`
//! differs from the current date. See `core::menu`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Menu item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    /// Unique identifier for the menu item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Restaurant offering the item
    pub restaurant_id: i64,
    /// Dish name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Current price
    pub price: f64,
    /// Menu section (e.g. "Starters")
    #[sea_orm(indexed)]
    pub category: String,
    /// Suitable for vegetarians
    pub is_vegetarian: bool,
    /// Suitable for vegans
    pub is_vegan: bool,
    /// Marked as a light / healthy option
    pub is_guilt_free: bool,
    /// File name under the upload directory
    pub image_path: Option<String>,
    /// Chef's special
    pub is_special: bool,
    /// Deal of the day; at most one per restaurant
    pub is_deal_of_day: bool,
    /// Units ordered on `last_order_date`
    pub times_ordered_today: i32,
    /// Day the counter refers to
    pub last_order_date: Option<Date>,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When the item was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `MenuItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each menu item belongs to one restaurant
    #[sea_orm(
        belongs_to = "super::restaurant::Entity",
        from = "Column::RestaurantId",
        to = "super::restaurant::Column::Id"
    )]
    Restaurant,
    /// One menu item appears in many order items
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    /// One menu item has many dish ratings
    #[sea_orm(has_many = "super::dish_rating::Entity")]
    DishRatings,
}

impl Related<super::restaurant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Restaurant.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::dish_rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DishRatings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
