//! Order business logic - Handles order lookups and status changes.
//!
//! Orders are created by `Cart::checkout`. Afterwards only the owner of the restaurant may
//! change the status, and only customers who placed an order may read it from the customer side.

use crate::{
    entities::{MenuItem, Order, OrderItem, Restaurant, menu_item, order, order_item, restaurant},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryOrder, QuerySelect, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Lifecycle of an order.
///
/// Any status can be set from any other; owners are trusted to move orders
/// along sensibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, waiting for the restaurant
    Pending,
    /// Accepted by the restaurant
    Confirmed,
    /// Being cooked
    Preparing,
    /// Waiting for pickup
    Ready,
    /// Handed over; feedback is now possible
    Completed,
    /// Will not be fulfilled
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Preparing => "Preparing",
            Self::Ready => "Ready for Pickup",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidStatus {
                status: s.to_string(),
            })
    }
}

/// Finds an order by id.
pub async fn get_order<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })
}

/// Finds an order placed by the given customer.
pub async fn get_order_for_customer<C>(
    db: &C,
    customer_id: i64,
    order_id: i64,
) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let order = get_order(db, order_id).await?;
    if order.customer_id != customer_id {
        return Err(Error::forbidden(format!(
            "order {order_id} does not belong to customer {customer_id}"
        )));
    }
    Ok(order)
}

/// Finds an order placed with one of the owner's restaurants.
pub async fn get_order_for_owner<C>(db: &C, owner_id: i64, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let order = get_order(db, order_id).await?;
    crate::core::restaurant::get_owned_restaurant(db, owner_id, order.restaurant_id).await?;
    Ok(order)
}

/// Lines of an order.
pub async fn order_items<C>(db: &C, order_id: i64) -> Result<Vec<order_item::Model>>
where
    C: ConnectionTrait,
{
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lines of an order with their menu items, for display.
pub async fn order_items_with_menu<C>(
    db: &C,
    order_id: i64,
) -> Result<Vec<(order_item::Model, Option<menu_item::Model>)>>
where
    C: ConnectionTrait,
{
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .find_also_related(MenuItem)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Total units across all lines of an order.
pub async fn item_count<C>(db: &C, order_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let items = order_items(db, order_id).await?;
    Ok(items.iter().map(|i| i64::from(i.quantity)).sum())
}

/// A customer's orders, newest first.
///
/// `search` matches a substring of the order id or of the restaurant name.
pub async fn list_customer_orders<C>(
    db: &C,
    customer_id: i64,
    search: Option<&str>,
    status: Option<OrderStatus>,
) -> Result<Vec<(order::Model, Option<restaurant::Model>)>>
where
    C: ConnectionTrait,
{
    let mut query = Order::find().filter(order::Column::CustomerId.eq(customer_id));
    if let Some(status) = status {
        query = query.filter(order::Column::Status.eq(status.as_str()));
    }
    let orders = query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .find_also_related(Restaurant)
        .all(db)
        .await?;

    let Some(needle) = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
    else {
        return Ok(orders);
    };

    Ok(orders
        .into_iter()
        .filter(|(order, restaurant)| {
            order.id.to_string().contains(&needle)
                || restaurant
                    .as_ref()
                    .is_some_and(|r| r.name.to_lowercase().contains(&needle))
        })
        .collect())
}

/// The customer's latest orders.
pub async fn recent_customer_orders<C>(
    db: &C,
    customer_id: i64,
    limit: u64,
) -> Result<Vec<(order::Model, Option<restaurant::Model>)>>
where
    C: ConnectionTrait,
{
    Order::find()
        .filter(order::Column::CustomerId.eq(customer_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .limit(limit)
        .find_also_related(Restaurant)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Orders across the owner's restaurants, newest first.
///
/// When `restaurant_id` is given it must be one of the owner's restaurants.
pub async fn list_owner_orders<C>(
    db: &C,
    owner_id: i64,
    status: Option<OrderStatus>,
    restaurant_id: Option<i64>,
) -> Result<Vec<(order::Model, Option<restaurant::Model>)>>
where
    C: ConnectionTrait,
{
    let restaurant_ids: Vec<i64> = match restaurant_id {
        Some(id) => {
            crate::core::restaurant::get_owned_restaurant(db, owner_id, id).await?;
            vec![id]
        }
        None => crate::core::restaurant::list_owner_restaurants(db, owner_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect(),
    };
    if restaurant_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = Order::find().filter(order::Column::RestaurantId.is_in(restaurant_ids));
    if let Some(status) = status {
        query = query.filter(order::Column::Status.eq(status.as_str()));
    }
    query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .find_also_related(Restaurant)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sets the status of an order placed with one of the owner's restaurants.
pub async fn update_status<C>(
    db: &C,
    owner_id: i64,
    order_id: i64,
    new_status: &str,
) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let status: OrderStatus = new_status.parse()?;
    let order = get_order_for_owner(db, owner_id, order_id).await?;
    let previous = order.status.clone();

    let mut active: order::ActiveModel = order.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    info!("Order {} status changed from {} to {}", order_id, previous, status);
    Ok(updated)
}
