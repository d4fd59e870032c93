//! User entity - Login identity shared by customers and restaurant owners.
//!
//! Each user carries a role tag and owns exactly one profile row, either in
//! `customers` or in `restaurant_owners`, created and deleted together with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name
    #[sea_orm(unique)]
    pub username: String,
    /// Contact address, also used for password resets
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// `"customer"` or `"owner"`
    pub role: String,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Customer profile, present when role is customer
    #[sea_orm(has_one = "super::customer::Entity")]
    Customer,
    /// Owner profile, present when role is owner
    #[sea_orm(has_one = "super::restaurant_owner::Entity")]
    RestaurantOwner,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::restaurant_owner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RestaurantOwner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
