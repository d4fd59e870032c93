//! Dish rating entity - Star rating for one menu item of a completed order.
//!
//! A composite unique index on `(order_id, menu_item_id)` is created alongside
//! the table in `config::database::create_tables`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dish rating database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dish_ratings")]
pub struct Model {
    /// Unique identifier for the rating
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Order the dish was part of
    pub order_id: i64,
    /// Customer who rated it
    pub customer_id: i64,
    /// Restaurant serving the dish
    pub restaurant_id: i64,
    /// Rated dish
    pub menu_item_id: i64,
    /// Star rating, 1 to 5
    pub rating: i32,
    /// When the rating was submitted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `DishRating` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each rating belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    /// Each rating references one menu item
    #[sea_orm(
        belongs_to = "super::menu_item::Entity",
        from = "Column::MenuItemId",
        to = "super::menu_item::Column::Id"
    )]
    MenuItem,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
