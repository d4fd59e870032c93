//! Report generation business logic.
//!
//! This module aggregates a restaurant's orders over a time window into sales figures for its
//! owner. All functions are framework-agnostic and return structured data that the API layer
//! serialises as is.

use crate::{
    entities::{Feedback, MenuItem, Order, OrderItem, feedback, order, order_item, restaurant},
    errors::Result,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Length of the default report window in days.
pub const DEFAULT_REPORT_DAYS: i64 = 30;

/// Number of best sellers listed in a report.
pub const TOP_ITEMS: usize = 5;

/// A best-selling menu item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopItem {
    /// Menu item id
    pub menu_item_id: i64,
    /// Dish name, or a placeholder when the item was removed
    pub name: String,
    /// Units sold in the window
    pub quantity: i64,
    /// Revenue from those units at the prices paid
    pub revenue: f64,
}

/// Orders and revenue of a single day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotals {
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Orders placed that day
    pub orders: u64,
    /// Sum of their totals
    pub revenue: f64,
}

/// Sales summary of one restaurant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantReport {
    /// The restaurant being reported on
    pub restaurant: restaurant::Model,
    /// Start of the window, inclusive
    pub from: DateTime<Utc>,
    /// End of the window, inclusive
    pub to: DateTime<Utc>,
    /// Orders placed in the window
    pub orders_count: u64,
    /// Sum of their totals
    pub total_revenue: f64,
    /// Average order feedback rating left in the window
    pub average_rating: Option<f64>,
    /// Best sellers by units sold
    pub top_items: Vec<TopItem>,
    /// One entry per day that had orders, oldest first
    pub daily: Vec<DailyTotals>,
}

/// Returns the default window: the last [`DEFAULT_REPORT_DAYS`] days up to `now`.
#[must_use]
pub fn default_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(DEFAULT_REPORT_DAYS), now)
}

/// Generates the sales report of an owned restaurant.
///
/// # Arguments
/// * `db` - Database connection
/// * `owner_id` - Owner requesting the report; must own the restaurant
/// * `restaurant_id` - Restaurant to report on
/// * `from`, `to` - Inclusive window on the order creation time
///
/// # Returns
/// A structured `RestaurantReport`
pub async fn restaurant_report<C>(
    db: &C,
    owner_id: i64,
    restaurant_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<RestaurantReport>
where
    C: ConnectionTrait,
{
    let restaurant =
        crate::core::restaurant::get_owned_restaurant(db, owner_id, restaurant_id).await?;

    let orders = Order::find()
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .filter(order::Column::CreatedAt.between(from, to))
        .order_by_asc(order::Column::CreatedAt)
        .all(db)
        .await?;

    let mut daily: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();
    for order in &orders {
        let date = order.created_at.date_naive();
        let entry = daily.entry(date).or_insert(DailyTotals {
            date,
            orders: 0,
            revenue: 0.0,
        });
        entry.orders += 1;
        entry.revenue += order.total_amount;
    }
    let total_revenue = orders.iter().map(|o| o.total_amount).sum();

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let top_items = top_selling_items(db, order_ids).await?;

    let ratings: Vec<i32> = Feedback::find()
        .filter(feedback::Column::RestaurantId.eq(restaurant_id))
        .filter(feedback::Column::CreatedAt.between(from, to))
        .all(db)
        .await?
        .into_iter()
        .map(|f| f.rating)
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let average_rating = (!ratings.is_empty()).then(|| {
        ratings.iter().copied().map(i64::from).sum::<i64>() as f64 / ratings.len() as f64
    });

    Ok(RestaurantReport {
        restaurant,
        from,
        to,
        orders_count: u64::try_from(orders.len())?,
        total_revenue,
        average_rating,
        top_items,
        daily: daily.into_values().collect(),
    })
}

async fn top_selling_items<C>(db: &C, order_ids: Vec<i64>) -> Result<Vec<TopItem>>
where
    C: ConnectionTrait,
{
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }

    let lines = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .find_also_related(MenuItem)
        .all(db)
        .await?;

    let mut by_item: HashMap<i64, TopItem> = HashMap::new();
    for (line, item) in lines {
        let entry = by_item.entry(line.menu_item_id).or_insert_with(|| TopItem {
            menu_item_id: line.menu_item_id,
            name: item.map_or_else(|| format!("Item #{}", line.menu_item_id), |i| i.name),
            quantity: 0,
            revenue: 0.0,
        });
        entry.quantity += i64::from(line.quantity);
        entry.revenue += line.subtotal();
    }

    let mut top: Vec<TopItem> = by_item.into_values().collect();
    top.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then(a.menu_item_id.cmp(&b.menu_item_id))
    });
    top.truncate(TOP_ITEMS);
    Ok(top)
}

/// Formats an amount as currency, e.g. `"$21.98"`.
#[must_use]
pub fn format_currency(amount: f64) -> String {
    format!("${amount:.2}")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_default_window() {
        let now = Utc::now();
        let (from, to) = default_window(now);
        assert_eq!(to, now);
        assert_eq!((to - from).num_days(), 30);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(21.98), "$21.98");
        assert_eq!(format_currency(0.0), "$0.00");
    }

    #[tokio::test]
    async fn test_report_empty_restaurant() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let (from, to) = default_window(Utc::now());

        let report =
            restaurant_report(&fixture.db, fixture.owner.id, fixture.restaurant.id, from, to)
                .await?;
        assert_eq!(report.orders_count, 0);
        assert_eq!(report.total_revenue, 0.0);
        assert_eq!(report.average_rating, None);
        assert!(report.top_items.is_empty());
        assert!(report.daily.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_report_aggregates_orders() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        let naan =
            create_test_menu_item(db, fixture.owner.id, fixture.restaurant.id, "Naan", 2.0, false)
                .await?;

        let first = place_test_order(db, fixture.customer.id, &fixture.item, 2).await?;
        place_test_order(db, fixture.customer.id, &naan, 5).await?;
        complete_order(db, first.id).await?;
        crate::core::feedback::submit_feedback(db, fixture.customer.id, first.id, "4", "").await?;

        let now = Utc::now();
        let report = restaurant_report(
            db,
            fixture.owner.id,
            fixture.restaurant.id,
            now - Duration::days(1),
            now + Duration::minutes(1),
        )
        .await?;

        assert_eq!(report.orders_count, 2);
        assert!((report.total_revenue - 31.98).abs() < 1e-9);
        assert_eq!(report.average_rating, Some(4.0));
        assert_eq!(report.top_items.len(), 2);
        assert_eq!(report.top_items[0].name, "Naan");
        assert_eq!(report.top_items[0].quantity, 5);
        assert_eq!(report.top_items[1].menu_item_id, fixture.item.id);
        let daily_orders: u64 = report.daily.iter().map(|d| d.orders).sum();
        assert_eq!(daily_orders, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_report_window_excludes_old_orders() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        place_test_order(db, fixture.customer.id, &fixture.item, 1).await?;

        let long_ago = Utc::now() - Duration::days(90);
        let report = restaurant_report(
            db,
            fixture.owner.id,
            fixture.restaurant.id,
            long_ago - Duration::days(30),
            long_ago,
        )
        .await?;
        assert_eq!(report.orders_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_report_requires_ownership() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let (_, rival) =
            crate::core::identity::register_owner(&fixture.db, test_account("rival")).await?;
        let (from, to) = default_window(Utc::now());

        let result =
            restaurant_report(&fixture.db, rival.id, fixture.restaurant.id, from, to).await;
        assert!(matches!(
            result.unwrap_err(),
            crate::errors::Error::Forbidden { .. }
        ));
        Ok(())
    }
}
