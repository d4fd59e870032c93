//! Recommendation logic - Restaurants and dishes a customer has not tried yet.
//!
//! Both recommenders are simple filters over stored data: favorite cuisines, dietary
//! restrictions, order history and dish ratings. Nothing is cached.

use crate::{
    core::{customer, menu, order::OrderStatus},
    entities::{
        DishRating, MenuItem, Order, OrderItem, Restaurant, dish_rating, menu_item, order,
        order_item, restaurant,
    },
    errors::Result,
};
use sea_orm::{ConnectionTrait, QueryOrder, prelude::*};
use std::collections::{BTreeMap, HashSet};

/// Maximum number of recommended restaurants.
pub const MAX_RESTAURANTS: usize = 5;

/// Maximum number of recommended dishes.
pub const MAX_DISHES: usize = 3;

/// A menu item with its average dish rating.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RatedDish {
    /// The dish
    pub item: menu_item::Model,
    /// Average of all its dish ratings
    pub average_rating: f64,
}

async fn ordered_restaurant_ids<C>(db: &C, customer_id: i64) -> Result<HashSet<i64>>
where
    C: ConnectionTrait,
{
    Ok(Order::find()
        .filter(order::Column::CustomerId.eq(customer_id))
        .all(db)
        .await?
        .into_iter()
        .map(|o| o.restaurant_id)
        .collect())
}

/// Restaurants the customer has never ordered from.
///
/// Those sharing a favorite cuisine come first, followed by those serving
/// at least one dish matching the customer's dietary restrictions.
pub async fn recommend_restaurants<C>(db: &C, customer_id: i64) -> Result<Vec<restaurant::Model>>
where
    C: ConnectionTrait,
{
    let customer = customer::get_customer(db, customer_id).await?;
    let preferences = customer::get_preferences(&customer)?;
    let restrictions = customer::get_dietary_restrictions(&customer)?;
    let ordered = ordered_restaurant_ids(db, customer_id).await?;

    let candidates: Vec<restaurant::Model> = Restaurant::find()
        .order_by_asc(restaurant::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .filter(|r| !ordered.contains(&r.id))
        .collect();

    let favorite: HashSet<String> = preferences
        .favorite_cuisines
        .iter()
        .map(|c| c.to_lowercase())
        .collect();

    let mut by_cuisine = Vec::new();
    let mut rest = Vec::new();
    for candidate in candidates {
        let shares_cuisine = !favorite.is_empty()
            && crate::core::restaurant::decode_cuisines(&candidate)?
                .iter()
                .any(|c| favorite.contains(&c.to_lowercase()));
        if shares_cuisine {
            by_cuisine.push(candidate);
        } else {
            rest.push(candidate);
        }
    }

    let dietary_ids = menu::restaurant_ids_matching_dietary(db, &restrictions).await?;
    let by_dietary = rest.into_iter().filter(|r| dietary_ids.contains(&r.id));

    let mut recommended = by_cuisine;
    recommended.extend(by_dietary);
    recommended.truncate(MAX_RESTAURANTS);
    Ok(recommended)
}

/// Best-rated dishes of a restaurant the customer has not received yet.
///
/// Only dishes with at least one rating qualify. When the customer has
/// dietary restrictions, dishes must match one of them.
pub async fn recommend_dishes<C>(
    db: &C,
    customer_id: i64,
    restaurant_id: i64,
) -> Result<Vec<RatedDish>>
where
    C: ConnectionTrait,
{
    let customer = customer::get_customer(db, customer_id).await?;
    let restrictions = customer::get_dietary_restrictions(&customer)?;

    let completed_ids: Vec<i64> = Order::find()
        .filter(order::Column::CustomerId.eq(customer_id))
        .filter(order::Column::Status.eq(OrderStatus::Completed.as_str()))
        .all(db)
        .await?
        .into_iter()
        .map(|o| o.id)
        .collect();
    let already_had: HashSet<i64> = if completed_ids.is_empty() {
        HashSet::new()
    } else {
        OrderItem::find()
            .filter(order_item::Column::OrderId.is_in(completed_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|i| i.menu_item_id)
            .collect()
    };

    let mut query = MenuItem::find().filter(menu_item::Column::RestaurantId.eq(restaurant_id));
    if let Some(condition) = menu::dietary_condition(&restrictions) {
        query = query.filter(condition);
    }
    let items: Vec<menu_item::Model> = query
        .all(db)
        .await?
        .into_iter()
        .filter(|i| !already_had.contains(&i.id))
        .collect();

    let mut totals: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    for rating in DishRating::find()
        .filter(dish_rating::Column::RestaurantId.eq(restaurant_id))
        .all(db)
        .await?
    {
        let entry = totals.entry(rating.menu_item_id).or_default();
        entry.0 += i64::from(rating.rating);
        entry.1 += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let mut rated: Vec<RatedDish> = items
        .into_iter()
        .filter_map(|item| {
            let &(sum, count) = totals.get(&item.id)?;
            Some(RatedDish {
                average_rating: sum as f64 / count as f64,
                item,
            })
        })
        .collect();

    rated.sort_by(|a, b| {
        b.average_rating
            .total_cmp(&a.average_rating)
            .then(a.item.id.cmp(&b.item.id))
    });
    rated.truncate(MAX_DISHES);
    Ok(rated)
}
