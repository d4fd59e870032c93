//! Customer entity - Profile of a user with the customer role.
//!
//! Preferences and dietary restrictions are stored as JSON text; use the
//! accessors in `core::customer` rather than reading the columns directly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Unique identifier for the customer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user account
    #[sea_orm(unique)]
    pub user_id: i64,
    /// Display name
    pub name: String,
    /// Delivery address
    pub address: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// JSON object with `favorite_cuisines` and `favorite_restaurants`
    pub preferences: Option<String>,
    /// JSON list of dietary tags
    pub dietary_restrictions: Option<String>,
    /// When the profile was created
    pub created_at: DateTimeUtc,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Customer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each customer belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One customer has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// One customer has many feedback entries
    #[sea_orm(has_many = "super::feedback::Entity")]
    Feedback,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
