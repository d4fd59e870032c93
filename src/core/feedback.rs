//! Feedback business logic - Order feedback, per-dish ratings and owner responses.
//!
//! Both kinds of rating are accepted only for the customer's own completed orders, once per
//! order. The application checks for an existing submission first; the unique indexes on
//! `feedback.order_id` and `dish_ratings(order_id, menu_item_id)` catch the concurrent case and
//! are reported the same way.

use crate::{
    core::order::{self, OrderStatus},
    entities::{DishRating, Feedback, dish_rating, feedback, order as order_entity},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*,
};
use std::collections::BTreeMap;
use tracing::info;

/// Rating used when the submitted value is missing or out of range.
pub const DEFAULT_RATING: i32 = 5;

/// Parses a star rating. Anything that is not an integer in `1..=5` becomes
/// [`DEFAULT_RATING`].
#[must_use]
pub fn clamp_rating(raw: &str) -> i32 {
    match raw.trim().parse::<i32>() {
        Ok(rating) if (1..=5).contains(&rating) => rating,
        _ => DEFAULT_RATING,
    }
}

fn already_submitted(err: DbErr, what: &'static str, order_id: i64) -> Error {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        Error::AlreadySubmitted { what, order_id }
    } else {
        err.into()
    }
}

async fn completed_order_for_customer<C>(
    db: &C,
    customer_id: i64,
    order_id: i64,
) -> Result<order_entity::Model>
where
    C: ConnectionTrait,
{
    let order = order::get_order_for_customer(db, customer_id, order_id).await?;
    if order.status != OrderStatus::Completed.as_str() {
        return Err(Error::FeedbackNotAllowed {
            order_id,
            status: order.status,
        });
    }
    Ok(order)
}

/// Feedback left on an order, if any.
pub async fn feedback_for_order<C>(db: &C, order_id: i64) -> Result<Option<feedback::Model>>
where
    C: ConnectionTrait,
{
    Feedback::find()
        .filter(feedback::Column::OrderId.eq(order_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Dish ratings left on an order.
pub async fn dish_ratings_for_order<C>(db: &C, order_id: i64) -> Result<Vec<dish_rating::Model>>
where
    C: ConnectionTrait,
{
    DishRating::find()
        .filter(dish_rating::Column::OrderId.eq(order_id))
        .order_by_asc(dish_rating::Column::MenuItemId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records the customer's feedback on a completed order.
pub async fn submit_feedback<C>(
    db: &C,
    customer_id: i64,
    order_id: i64,
    raw_rating: &str,
    message: &str,
) -> Result<feedback::Model>
where
    C: ConnectionTrait,
{
    let order = completed_order_for_customer(db, customer_id, order_id).await?;
    if feedback_for_order(db, order_id).await?.is_some() {
        return Err(Error::AlreadySubmitted {
            what: "Feedback",
            order_id,
        });
    }

    let now = Utc::now();
    let feedback = feedback::ActiveModel {
        order_id: Set(order_id),
        customer_id: Set(customer_id),
        restaurant_id: Set(order.restaurant_id),
        rating: Set(clamp_rating(raw_rating)),
        message: Set(message.trim().to_string()),
        response: Set(None),
        is_resolved: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| already_submitted(e, "Feedback", order_id))?;

    info!(
        "Feedback {} ({} stars) submitted for order {}",
        feedback.id, feedback.rating, order_id
    );
    Ok(feedback)
}

/// Records one rating per item of a completed order.
///
/// `ratings` maps menu item ids to raw rating values. Items of the order
/// missing from the map get [`DEFAULT_RATING`]; ids that are not part of the
/// order are rejected.
pub async fn submit_dish_ratings(
    db: &DatabaseConnection,
    customer_id: i64,
    order_id: i64,
    ratings: &BTreeMap<i64, String>,
) -> Result<Vec<dish_rating::Model>> {
    let txn = db.begin().await?;
    let order = completed_order_for_customer(&txn, customer_id, order_id).await?;
    if !dish_ratings_for_order(&txn, order_id).await?.is_empty() {
        return Err(Error::AlreadySubmitted {
            what: "Dish rating",
            order_id,
        });
    }

    let mut item_ids: Vec<i64> = order::order_items(&txn, order_id)
        .await?
        .into_iter()
        .map(|i| i.menu_item_id)
        .collect();
    item_ids.sort_unstable();
    item_ids.dedup();

    if let Some(unknown) = ratings.keys().find(|id| !item_ids.contains(id)) {
        return Err(Error::validation(format!(
            "Menu item {unknown} is not part of order {order_id}."
        )));
    }

    let now = Utc::now();
    let mut saved = Vec::with_capacity(item_ids.len());
    for menu_item_id in item_ids {
        let rating = ratings
            .get(&menu_item_id)
            .map_or(DEFAULT_RATING, |raw| clamp_rating(raw));
        let model = dish_rating::ActiveModel {
            order_id: Set(order_id),
            customer_id: Set(customer_id),
            restaurant_id: Set(order.restaurant_id),
            menu_item_id: Set(menu_item_id),
            rating: Set(rating),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| already_submitted(e, "Dish rating", order_id))?;
        saved.push(model);
    }

    txn.commit().await?;
    info!("{} dish ratings submitted for order {}", saved.len(), order_id);
    Ok(saved)
}

/// Stores the owner's reply and marks the feedback resolved.
pub async fn respond_to_feedback<C>(
    db: &C,
    owner_id: i64,
    feedback_id: i64,
    response: &str,
) -> Result<feedback::Model>
where
    C: ConnectionTrait,
{
    let response = response.trim();
    if response.is_empty() {
        return Err(Error::validation("Response cannot be empty."));
    }

    let feedback = Feedback::find_by_id(feedback_id)
        .one(db)
        .await?
        .ok_or(Error::FeedbackNotFound { id: feedback_id })?;
    crate::core::restaurant::get_owned_restaurant(db, owner_id, feedback.restaurant_id).await?;

    let mut active: feedback::ActiveModel = feedback.into();
    active.response = Set(Some(response.to_string()));
    active.is_resolved = Set(true);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    info!("Owner {} responded to feedback {}", owner_id, feedback_id);
    Ok(updated)
}

/// Feedback on a restaurant, newest first.
pub async fn feedback_for_restaurant<C>(db: &C, restaurant_id: i64) -> Result<Vec<feedback::Model>>
where
    C: ConnectionTrait,
{
    Feedback::find()
        .filter(feedback::Column::RestaurantId.eq(restaurant_id))
        .order_by_desc(feedback::Column::CreatedAt)
        .order_by_desc(feedback::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Feedback across all of the owner's restaurants, newest first.
pub async fn feedback_for_owner<C>(
    db: &C,
    owner_id: i64,
    only_pending: bool,
) -> Result<Vec<feedback::Model>>
where
    C: ConnectionTrait,
{
    let restaurant_ids: Vec<i64> = crate::core::restaurant::list_owner_restaurants(db, owner_id)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    if restaurant_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = Feedback::find().filter(feedback::Column::RestaurantId.is_in(restaurant_ids));
    if only_pending {
        query = query.filter(feedback::Column::IsResolved.eq(false));
    }
    query
        .order_by_desc(feedback::Column::CreatedAt)
        .order_by_desc(feedback::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[allow(clippy::cast_precision_loss)]
fn mean(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().copied().map(i64::from).sum();
    Some(sum as f64 / ratings.len() as f64)
}

/// Average dish rating of a menu item, `None` when it was never rated.
pub async fn average_dish_rating<C>(db: &C, menu_item_id: i64) -> Result<Option<f64>>
where
    C: ConnectionTrait,
{
    let ratings: Vec<i32> = DishRating::find()
        .filter(dish_rating::Column::MenuItemId.eq(menu_item_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();
    Ok(mean(&ratings))
}

/// Average order feedback rating of a restaurant, `None` without feedback.
pub async fn average_restaurant_rating<C>(db: &C, restaurant_id: i64) -> Result<Option<f64>>
where
    C: ConnectionTrait,
{
    let ratings: Vec<i32> = feedback_for_restaurant(db, restaurant_id)
        .await?
        .into_iter()
        .map(|f| f.rating)
        .collect();
    Ok(mean(&ratings))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_clamp_rating() {
        assert_eq!(clamp_rating("1"), 1);
        assert_eq!(clamp_rating(" 3 "), 3);
        assert_eq!(clamp_rating("5"), 5);
        assert_eq!(clamp_rating("0"), 5);
        assert_eq!(clamp_rating("6"), 5);
        assert_eq!(clamp_rating("-2"), 5);
        assert_eq!(clamp_rating("4.5"), 5);
        assert_eq!(clamp_rating("great"), 5);
        assert_eq!(clamp_rating(""), 5);
    }

    #[tokio::test]
    async fn test_feedback_only_once_on_completed_order() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        let order = place_test_order(db, fixture.customer.id, &fixture.item, 1).await?;

        let result = submit_feedback(db, fixture.customer.id, order.id, "4", "Nice").await;
        assert!(matches!(result.unwrap_err(), Error::FeedbackNotAllowed { .. }));

        complete_order(db, order.id).await?;
        let feedback = submit_feedback(db, fixture.customer.id, order.id, "4", " Nice ").await?;
        assert_eq!(feedback.rating, 4);
        assert_eq!(feedback.message, "Nice");
        assert_eq!(feedback.restaurant_id, fixture.restaurant.id);
        assert!(!feedback.is_resolved);

        let result = submit_feedback(db, fixture.customer.id, order.id, "2", "Again").await;
        assert!(matches!(
            result.unwrap_err(),
            Error::AlreadySubmitted {
                what: "Feedback",
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_feedback_out_of_range_rating_stored_as_five() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        let order = place_test_order(db, fixture.customer.id, &fixture.item, 1).await?;
        complete_order(db, order.id).await?;

        let feedback = submit_feedback(db, fixture.customer.id, order.id, "0", "").await?;
        assert_eq!(feedback.rating, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_feedback_on_someone_elses_order() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        let order = place_test_order(db, fixture.customer.id, &fixture.item, 1).await?;
        complete_order(db, order.id).await?;
        let (_, other) =
            crate::core::identity::register_customer(db, test_account("nosy")).await?;

        let result = submit_feedback(db, other.id, order.id, "1", "Bad").await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_unique_index_maps_to_already_submitted() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        let order = place_test_order(db, fixture.customer.id, &fixture.item, 1).await?;
        let now = Utc::now();
        let row = || feedback::ActiveModel {
            order_id: Set(order.id),
            customer_id: Set(fixture.customer.id),
            restaurant_id: Set(fixture.restaurant.id),
            rating: Set(5),
            message: Set(String::new()),
            response: Set(None),
            is_resolved: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        row().insert(db).await?;
        let err = row().insert(db).await.unwrap_err();
        assert!(matches!(
            already_submitted(err, "Feedback", order.id),
            Error::AlreadySubmitted { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_dish_ratings_batch() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        let naan =
            create_test_menu_item(db, fixture.owner.id, fixture.restaurant.id, "Naan", 2.0, false)
                .await?;

        let mut cart = crate::core::cart::Cart::default();
        cart.add(db, fixture.item.id, 1).await?;
        cart.add(db, naan.id, 2).await?;
        let order = cart
            .checkout(db, fixture.customer.id, chrono::Utc::now().date_naive())
            .await?;

        let ratings: BTreeMap<i64, String> = [(fixture.item.id, "6".to_string())].into();
        let result = submit_dish_ratings(db, fixture.customer.id, order.id, &ratings).await;
        assert!(matches!(result.unwrap_err(), Error::FeedbackNotAllowed { .. }));

        complete_order(db, order.id).await?;

        let bogus: BTreeMap<i64, String> = [(9999, "3".to_string())].into();
        let result = submit_dish_ratings(db, fixture.customer.id, order.id, &bogus).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let out_of_range: BTreeMap<i64, String> = [
            (fixture.item.id, "6".to_string()),
            (naan.id, "0".to_string()),
        ]
        .into();
        let saved = submit_dish_ratings(db, fixture.customer.id, order.id, &out_of_range).await?;
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|r| r.rating == 5));

        let result = submit_dish_ratings(db, fixture.customer.id, order.id, &ratings).await;
        assert!(matches!(result.unwrap_err(), Error::AlreadySubmitted { .. }));
        assert_eq!(dish_ratings_for_order(db, order.id).await?.len(), 2);

        assert_eq!(average_dish_rating(db, naan.id).await?, Some(5.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_respond_to_feedback() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        let order = place_test_order(db, fixture.customer.id, &fixture.item, 1).await?;
        complete_order(db, order.id).await?;
        let feedback = submit_feedback(db, fixture.customer.id, order.id, "2", "Cold").await?;

        assert_eq!(feedback_for_owner(db, fixture.owner.id, true).await?.len(), 1);

        let (_, rival) = crate::core::identity::register_owner(db, test_account("rival")).await?;
        let result = respond_to_feedback(db, rival.id, feedback.id, "Sorry").await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));

        let result = respond_to_feedback(db, fixture.owner.id, feedback.id, "   ").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let updated = respond_to_feedback(db, fixture.owner.id, feedback.id, "Sorry!").await?;
        assert_eq!(updated.response.as_deref(), Some("Sorry!"));
        assert!(updated.is_resolved);
        assert_eq!(updated.rating, 2);
        assert_eq!(updated.message, "Cold");

        assert!(feedback_for_owner(db, fixture.owner.id, true).await?.is_empty());
        assert_eq!(feedback_for_owner(db, fixture.owner.id, false).await?.len(), 1);
        assert_eq!(
            average_restaurant_rating(db, fixture.restaurant.id).await?,
            Some(2.0)
        );
        Ok(())
    }
}
