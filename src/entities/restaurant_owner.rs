//! Restaurant owner entity - Profile of a user with the owner role.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Restaurant owner database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "restaurant_owners")]
pub struct Model {
    /// Unique identifier for the owner
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user account
    #[sea_orm(unique)]
    pub user_id: i64,
    /// Display name
    pub name: String,
    /// Phone number
    pub phone: Option<String>,
    /// When the profile was created
    pub created_at: DateTimeUtc,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `RestaurantOwner` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each owner belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One owner has many restaurants
    #[sea_orm(has_many = "super::restaurant::Entity")]
    Restaurants,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::restaurant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Restaurants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
