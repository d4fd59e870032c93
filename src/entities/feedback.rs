//! Feedback entity - The customer's verdict on a completed order.
//!
//! `order_id` is unique: the schema, not just the application, guarantees a
//! single feedback row per order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Feedback database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feedback")]
pub struct Model {
    /// Unique identifier for the feedback
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Order the feedback is about
    #[sea_orm(unique)]
    pub order_id: i64,
    /// Customer who wrote it
    pub customer_id: i64,
    /// Restaurant the order was placed with
    pub restaurant_id: i64,
    /// Star rating, 1 to 5
    pub rating: i32,
    /// Optional comment, empty when not given
    pub message: String,
    /// Owner's reply
    pub response: Option<String>,
    /// Set once the owner replied
    pub is_resolved: bool,
    /// When the feedback was submitted
    pub created_at: DateTimeUtc,
    /// When the feedback was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Feedback and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each feedback entry belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    /// Each feedback entry belongs to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
