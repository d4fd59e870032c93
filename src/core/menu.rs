//! Menu item business logic - Handles menu management and the daily order counter.
//!
//! Each menu item counts how many units were ordered "today". There is no scheduled job: the
//! counter is reset lazily whenever it is read or incremented on a date other than the stored
//! `last_order_date`. The read-modify-write must run inside the caller's transaction (checkout
//! does this) so concurrent orders on the same item do not lose updates.
//!
//! At most one item per restaurant is the deal of the day. Setting the flag clears it on the
//! restaurant's other items in the same transaction.

use crate::{
    core::customer::{DietaryRestrictions, DietaryTag},
    entities::{DishRating, MenuItem, OrderItem, dish_rating, menu_item, order_item, restaurant},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{Condition, ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// An item ordered more than this many times today is "mostly ordered".
pub const MOSTLY_ORDERED_THRESHOLD: i32 = 10;

/// Editable menu item fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemInput {
    /// Dish name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Price, finite and not negative
    pub price: f64,
    /// Menu section
    pub category: String,
    /// Suitable for vegetarians
    #[serde(default)]
    pub is_vegetarian: bool,
    /// Suitable for vegans
    #[serde(default)]
    pub is_vegan: bool,
    /// Light / healthy option
    #[serde(default)]
    pub is_guilt_free: bool,
    /// Chef's special
    #[serde(default)]
    pub is_special: bool,
    /// Deal of the day
    #[serde(default)]
    pub is_deal_of_day: bool,
}

/// Filters for a restaurant's menu. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct MenuFilter {
    /// Case-insensitive substring of name or description
    pub search: Option<String>,
    /// Lowest price, inclusive
    pub min_price: Option<f64>,
    /// Highest price, inclusive
    pub max_price: Option<f64>,
    /// Exact category
    pub category: Option<String>,
    /// Items carrying any of these tags
    pub dietary: DietaryRestrictions,
}

fn validate_input(input: &MenuItemInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("Menu item name cannot be empty"));
    }
    if input.category.trim().is_empty() {
        return Err(Error::validation("Menu item category cannot be empty"));
    }
    if input.price < 0.0 || !input.price.is_finite() {
        return Err(Error::InvalidAmount {
            amount: input.price,
        });
    }
    Ok(())
}

/// Finds a menu item by id.
pub async fn get_menu_item<C>(db: &C, item_id: i64) -> Result<menu_item::Model>
where
    C: ConnectionTrait,
{
    MenuItem::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(Error::MenuItemNotFound { id: item_id })
}

/// Finds a menu item together with its restaurant and checks ownership.
pub async fn get_owned_menu_item<C>(
    db: &C,
    owner_id: i64,
    item_id: i64,
) -> Result<(menu_item::Model, restaurant::Model)>
where
    C: ConnectionTrait,
{
    let item = get_menu_item(db, item_id).await?;
    let restaurant =
        crate::core::restaurant::get_owned_restaurant(db, owner_id, item.restaurant_id).await?;
    Ok((item, restaurant))
}

async fn clear_deal_of_day<C>(db: &C, restaurant_id: i64, except: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut update = MenuItem::update_many()
        .col_expr(menu_item::Column::IsDealOfDay, Expr::value(false))
        .filter(menu_item::Column::RestaurantId.eq(restaurant_id))
        .filter(menu_item::Column::IsDealOfDay.eq(true));
    if let Some(id) = except {
        update = update.filter(menu_item::Column::Id.ne(id));
    }
    update.exec(db).await?;
    Ok(())
}

/// Adds a menu item to an owned restaurant.
pub async fn create_menu_item(
    db: &DatabaseConnection,
    owner_id: i64,
    restaurant_id: i64,
    input: MenuItemInput,
) -> Result<menu_item::Model> {
    validate_input(&input)?;

    let txn = db.begin().await?;
    crate::core::restaurant::get_owned_restaurant(&txn, owner_id, restaurant_id).await?;

    if input.is_deal_of_day {
        clear_deal_of_day(&txn, restaurant_id, None).await?;
    }

    let now = Utc::now();
    let item = menu_item::ActiveModel {
        restaurant_id: Set(restaurant_id),
        name: Set(input.name.trim().to_string()),
        description: Set(input.description),
        price: Set(input.price),
        category: Set(input.category.trim().to_string()),
        is_vegetarian: Set(input.is_vegetarian),
        is_vegan: Set(input.is_vegan),
        is_guilt_free: Set(input.is_guilt_free),
        image_path: Set(None),
        is_special: Set(input.is_special),
        is_deal_of_day: Set(input.is_deal_of_day),
        times_ordered_today: Set(0),
        last_order_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!("Menu item '{}' created in restaurant {}", item.name, restaurant_id);
    Ok(item)
}

/// Replaces the editable fields of an owned menu item.
pub async fn update_menu_item(
    db: &DatabaseConnection,
    owner_id: i64,
    item_id: i64,
    input: MenuItemInput,
) -> Result<menu_item::Model> {
    validate_input(&input)?;

    let txn = db.begin().await?;
    let (item, restaurant) = get_owned_menu_item(&txn, owner_id, item_id).await?;

    if input.is_deal_of_day && !item.is_deal_of_day {
        clear_deal_of_day(&txn, restaurant.id, Some(item_id)).await?;
    }

    let mut active: menu_item::ActiveModel = item.into();
    active.name = Set(input.name.trim().to_string());
    active.description = Set(input.description);
    active.price = Set(input.price);
    active.category = Set(input.category.trim().to_string());
    active.is_vegetarian = Set(input.is_vegetarian);
    active.is_vegan = Set(input.is_vegan);
    active.is_guilt_free = Set(input.is_guilt_free);
    active.is_special = Set(input.is_special);
    active.is_deal_of_day = Set(input.is_deal_of_day);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!("Menu item '{}' updated", updated.name);
    Ok(updated)
}

/// Points an owned menu item at a new image file and returns the previous one.
pub async fn set_menu_item_image<C>(
    db: &C,
    owner_id: i64,
    item_id: i64,
    image_path: String,
) -> Result<(menu_item::Model, Option<String>)>
where
    C: ConnectionTrait,
{
    let (item, _) = get_owned_menu_item(db, owner_id, item_id).await?;
    let previous = item.image_path.clone();

    let mut active: menu_item::ActiveModel = item.into();
    active.image_path = Set(Some(image_path));
    active.updated_at = Set(Utc::now());
    Ok((active.update(db).await?, previous))
}

/// Deletes an owned menu item along with its order lines and dish ratings.
///
/// Returns the item's image file name, if any.
pub async fn delete_menu_item(
    db: &DatabaseConnection,
    owner_id: i64,
    item_id: i64,
) -> Result<Option<String>> {
    let txn = db.begin().await?;
    let (item, _) = get_owned_menu_item(&txn, owner_id, item_id).await?;

    DishRating::delete_many()
        .filter(dish_rating::Column::MenuItemId.eq(item_id))
        .exec(&txn)
        .await?;
    OrderItem::delete_many()
        .filter(order_item::Column::MenuItemId.eq(item_id))
        .exec(&txn)
        .await?;
    MenuItem::delete_by_id(item_id).exec(&txn).await?;

    txn.commit().await?;
    info!("Menu item '{}' deleted", item.name);
    Ok(item.image_path)
}

/// SQL condition matching items that carry any of the given tags, or `None`
/// when there are no tags.
#[must_use]
pub fn dietary_condition(tags: &DietaryRestrictions) -> Option<Condition> {
    if tags.is_empty() {
        return None;
    }
    let condition = tags.iter().fold(Condition::any(), |cond, tag| {
        let column = match tag {
            DietaryTag::Vegetarian => menu_item::Column::IsVegetarian,
            DietaryTag::Vegan => menu_item::Column::IsVegan,
            DietaryTag::GuiltFree => menu_item::Column::IsGuiltFree,
        };
        cond.add(column.eq(true))
    });
    Some(condition)
}

/// Ids of restaurants offering at least one item that carries any of `tags`.
pub async fn restaurant_ids_matching_dietary<C>(
    db: &C,
    tags: &DietaryRestrictions,
) -> Result<HashSet<i64>>
where
    C: ConnectionTrait,
{
    let Some(condition) = dietary_condition(tags) else {
        return Ok(HashSet::new());
    };
    Ok(MenuItem::find()
        .filter(condition)
        .all(db)
        .await?
        .into_iter()
        .map(|item| item.restaurant_id)
        .collect())
}

/// Menu of a restaurant filtered by `filter`, ordered by category then name.
pub async fn list_menu_items<C>(
    db: &C,
    restaurant_id: i64,
    filter: &MenuFilter,
) -> Result<Vec<menu_item::Model>>
where
    C: ConnectionTrait,
{
    let mut query = MenuItem::find().filter(menu_item::Column::RestaurantId.eq(restaurant_id));

    if let Some(search) = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        query = query.filter(
            Condition::any()
                .add(menu_item::Column::Name.contains(search))
                .add(menu_item::Column::Description.contains(search)),
        );
    }
    if let Some(min) = filter.min_price {
        query = query.filter(menu_item::Column::Price.gte(min));
    }
    if let Some(max) = filter.max_price {
        query = query.filter(menu_item::Column::Price.lte(max));
    }
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        query = query.filter(menu_item::Column::Category.eq(category));
    }
    if let Some(condition) = dietary_condition(&filter.dietary) {
        query = query.filter(condition);
    }

    query
        .order_by_asc(menu_item::Column::Category)
        .order_by_asc(menu_item::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Groups items by category, keeping the input order inside each group.
#[must_use]
pub fn menu_by_category(items: Vec<menu_item::Model>) -> BTreeMap<String, Vec<menu_item::Model>> {
    let mut grouped: BTreeMap<String, Vec<menu_item::Model>> = BTreeMap::new();
    for item in items {
        grouped.entry(item.category.clone()).or_default().push(item);
    }
    grouped
}

/// Distinct non-empty categories of a restaurant's menu, sorted.
pub async fn menu_categories<C>(db: &C, restaurant_id: i64) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    let items = list_menu_items(db, restaurant_id, &MenuFilter::default()).await?;
    let mut categories: Vec<String> = items
        .into_iter()
        .map(|i| i.category)
        .filter(|c| !c.is_empty())
        .collect();
    categories.dedup();
    Ok(categories)
}

/// Lowest and highest price on a restaurant's menu, `None` for an empty menu.
pub async fn price_range<C>(db: &C, restaurant_id: i64) -> Result<Option<(f64, f64)>>
where
    C: ConnectionTrait,
{
    let items = list_menu_items(db, restaurant_id, &MenuFilter::default()).await?;
    Ok(items.iter().map(|i| i.price).fold(None, |range, price| {
        Some(match range {
            None => (price, price),
            Some((lo, hi)) => (lo.min(price), hi.max(price)),
        })
    }))
}

/// Lazily resets the counter when it belongs to a different day.
///
/// Returns `true` if the model was changed.
pub fn refresh_daily_counter(item: &mut menu_item::Model, today: NaiveDate) -> bool {
    if item.last_order_date == Some(today) {
        return false;
    }
    item.times_ordered_today = 0;
    item.last_order_date = Some(today);
    true
}

/// Units ordered today without touching the database.
#[must_use]
pub fn ordered_today(item: &menu_item::Model, today: NaiveDate) -> i32 {
    if item.last_order_date == Some(today) {
        item.times_ordered_today
    } else {
        0
    }
}

async fn save_counter<C>(db: &C, item: menu_item::Model) -> Result<menu_item::Model>
where
    C: ConnectionTrait,
{
    let mut active: menu_item::ActiveModel = item.clone().into();
    active.times_ordered_today = Set(item.times_ordered_today);
    active.last_order_date = Set(item.last_order_date);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Adds `quantity` to today's counter, resetting it first if it is stale.
///
/// Call this inside the transaction that records the order.
pub async fn increment_daily_order_count<C>(
    db: &C,
    item_id: i64,
    quantity: i32,
    today: NaiveDate,
) -> Result<menu_item::Model>
where
    C: ConnectionTrait,
{
    let mut item = get_menu_item(db, item_id).await?;
    refresh_daily_counter(&mut item, today);
    item.times_ordered_today = item.times_ordered_today.saturating_add(quantity);
    save_counter(db, item).await
}

/// Sets today's counter to zero. Calling it repeatedly has no further effect.
pub async fn reset_daily_order_count<C>(
    db: &C,
    item_id: i64,
    today: NaiveDate,
) -> Result<menu_item::Model>
where
    C: ConnectionTrait,
{
    let mut item = get_menu_item(db, item_id).await?;
    item.times_ordered_today = 0;
    item.last_order_date = Some(today);
    save_counter(db, item).await
}

/// True when the item was ordered more than [`MOSTLY_ORDERED_THRESHOLD`]
/// times today. A stale counter is reset and persisted first.
pub async fn is_mostly_ordered<C>(db: &C, item_id: i64, today: NaiveDate) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut item = get_menu_item(db, item_id).await?;
    if refresh_daily_counter(&mut item, today) {
        item = save_counter(db, item).await?;
    }
    Ok(item.times_ordered_today > MOSTLY_ORDERED_THRESHOLD)
}
