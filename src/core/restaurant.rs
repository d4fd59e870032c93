//! Restaurant business logic - Handles restaurant management and search.
//!
//! Restaurants are created, edited and deleted only by the owner they belong to. Deleting a
//! restaurant removes its menu, orders and feedback in the same transaction and hands back the
//! image files that should be cleaned up afterwards.

use crate::{
    core::customer::DietaryRestrictions,
    entities::{
        DishRating, Feedback, MenuItem, Order, OrderItem, Restaurant, dish_rating, feedback,
        menu_item, order, order_item, restaurant,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::BTreeSet;
use tracing::info;

/// Editable restaurant fields.
#[derive(Debug, Clone, Default)]
pub struct RestaurantInput {
    /// Restaurant name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Address or area
    pub location: String,
    /// Cuisine tags, stored as given
    pub cuisines: Vec<String>,
}

/// Filters for the customer restaurant listing. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct RestaurantSearch {
    /// Case-insensitive substring of the name
    pub query: Option<String>,
    /// Case-insensitive substring of the location
    pub location: Option<String>,
    /// Match restaurants tagged with any of these cuisines
    pub cuisines: Vec<String>,
    /// Match restaurants with at least one menu item carrying any of these tags
    pub dietary: DietaryRestrictions,
}

/// Encodes a cuisine list for storage, exactly as given.
pub fn encode_cuisines(cuisines: &[String]) -> Result<String> {
    serde_json::to_string(cuisines).map_err(Into::into)
}

/// Decodes the stored cuisine list.
pub fn decode_cuisines(restaurant: &restaurant::Model) -> Result<Vec<String>> {
    if restaurant.cuisines.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&restaurant.cuisines).map_err(Into::into)
}

fn validate_input(input: &RestaurantInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("Restaurant name cannot be empty"));
    }
    if input.location.trim().is_empty() {
        return Err(Error::validation("Restaurant location cannot be empty"));
    }
    Ok(())
}

/// Finds a restaurant by id.
pub async fn get_restaurant<C>(db: &C, restaurant_id: i64) -> Result<restaurant::Model>
where
    C: ConnectionTrait,
{
    Restaurant::find_by_id(restaurant_id)
        .one(db)
        .await?
        .ok_or(Error::RestaurantNotFound { id: restaurant_id })
}

/// Finds a restaurant and checks that `owner_id` owns it.
pub async fn get_owned_restaurant<C>(
    db: &C,
    owner_id: i64,
    restaurant_id: i64,
) -> Result<restaurant::Model>
where
    C: ConnectionTrait,
{
    let restaurant = get_restaurant(db, restaurant_id).await?;
    if restaurant.owner_id != owner_id {
        return Err(Error::forbidden(format!(
            "restaurant {restaurant_id} does not belong to owner {owner_id}"
        )));
    }
    Ok(restaurant)
}

/// All restaurants of an owner, alphabetically.
pub async fn list_owner_restaurants<C>(db: &C, owner_id: i64) -> Result<Vec<restaurant::Model>>
where
    C: ConnectionTrait,
{
    Restaurant::find()
        .filter(restaurant::Column::OwnerId.eq(owner_id))
        .order_by_asc(restaurant::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a restaurant for an owner.
pub async fn create_restaurant<C>(
    db: &C,
    owner_id: i64,
    input: RestaurantInput,
    image_path: Option<String>,
) -> Result<restaurant::Model>
where
    C: ConnectionTrait,
{
    validate_input(&input)?;

    let now = Utc::now();
    let restaurant = restaurant::ActiveModel {
        owner_id: Set(owner_id),
        name: Set(input.name.trim().to_string()),
        description: Set(input.description),
        location: Set(input.location.trim().to_string()),
        cuisines: Set(encode_cuisines(&input.cuisines)?),
        image_path: Set(image_path),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Restaurant '{}' created by owner {}", restaurant.name, owner_id);
    Ok(restaurant)
}

/// Replaces the editable fields of an owned restaurant.
pub async fn update_restaurant<C>(
    db: &C,
    owner_id: i64,
    restaurant_id: i64,
    input: RestaurantInput,
) -> Result<restaurant::Model>
where
    C: ConnectionTrait,
{
    validate_input(&input)?;
    let existing = get_owned_restaurant(db, owner_id, restaurant_id).await?;

    let mut active: restaurant::ActiveModel = existing.into();
    active.name = Set(input.name.trim().to_string());
    active.description = Set(input.description);
    active.location = Set(input.location.trim().to_string());
    active.cuisines = Set(encode_cuisines(&input.cuisines)?);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    info!("Restaurant '{}' updated by owner {}", updated.name, owner_id);
    Ok(updated)
}

/// Points an owned restaurant at a new image file.
///
/// Returns the updated restaurant and the previous file name, which the caller
/// should remove.
pub async fn set_restaurant_image<C>(
    db: &C,
    owner_id: i64,
    restaurant_id: i64,
    image_path: String,
) -> Result<(restaurant::Model, Option<String>)>
where
    C: ConnectionTrait,
{
    let existing = get_owned_restaurant(db, owner_id, restaurant_id).await?;
    let previous = existing.image_path.clone();

    let mut active: restaurant::ActiveModel = existing.into();
    active.image_path = Set(Some(image_path));
    active.updated_at = Set(Utc::now());
    Ok((active.update(db).await?, previous))
}

/// Deletes an owned restaurant with its menu, orders, feedback and ratings.
///
/// Returns the image file names of the restaurant and its menu items.
pub async fn delete_restaurant(
    db: &DatabaseConnection,
    owner_id: i64,
    restaurant_id: i64,
) -> Result<Vec<String>> {
    let txn = db.begin().await?;
    let restaurant = get_owned_restaurant(&txn, owner_id, restaurant_id).await?;
    let images = delete_restaurant_rows(&txn, restaurant_id).await?;
    txn.commit().await?;

    info!("Restaurant '{}' deleted by owner {}", restaurant.name, owner_id);
    Ok(images)
}

/// Deletes a restaurant and every row that depends on it, children first.
///
/// Runs on the caller's connection or transaction and does no ownership check.
pub(crate) async fn delete_restaurant_rows<C>(db: &C, restaurant_id: i64) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    let restaurant = get_restaurant(db, restaurant_id).await?;
    let items = MenuItem::find()
        .filter(menu_item::Column::RestaurantId.eq(restaurant_id))
        .all(db)
        .await?;
    let item_ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let order_ids: Vec<i64> = Order::find()
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .all(db)
        .await?
        .into_iter()
        .map(|o| o.id)
        .collect();

    let mut images: Vec<String> = items.into_iter().filter_map(|i| i.image_path).collect();
    images.extend(restaurant.image_path);

    DishRating::delete_many()
        .filter(dish_rating::Column::RestaurantId.eq(restaurant_id))
        .exec(db)
        .await?;
    Feedback::delete_many()
        .filter(feedback::Column::RestaurantId.eq(restaurant_id))
        .exec(db)
        .await?;
    OrderItem::delete_many()
        .filter(
            sea_orm::Condition::any()
                .add(order_item::Column::OrderId.is_in(order_ids))
                .add(order_item::Column::MenuItemId.is_in(item_ids)),
        )
        .exec(db)
        .await?;
    Order::delete_many()
        .filter(order::Column::RestaurantId.eq(restaurant_id))
        .exec(db)
        .await?;
    MenuItem::delete_many()
        .filter(menu_item::Column::RestaurantId.eq(restaurant_id))
        .exec(db)
        .await?;
    Restaurant::delete_by_id(restaurant_id).exec(db).await?;

    Ok(images)
}

/// Restaurants matching every non-empty filter of `search`, alphabetically.
pub async fn search_restaurants<C>(
    db: &C,
    search: &RestaurantSearch,
) -> Result<Vec<restaurant::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Restaurant::find();
    if let Some(q) = search.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query = query.filter(restaurant::Column::Name.contains(q));
    }
    if let Some(loc) = search
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
    {
        query = query.filter(restaurant::Column::Location.contains(loc));
    }
    let mut restaurants = query
        .order_by_asc(restaurant::Column::Name)
        .all(db)
        .await?;

    // Cuisines are a JSON list, so matching happens after the fetch.
    let wanted: BTreeSet<String> = search
        .cuisines
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();
    if !wanted.is_empty() {
        let mut kept = Vec::with_capacity(restaurants.len());
        for r in restaurants {
            if decode_cuisines(&r)?
                .iter()
                .any(|c| wanted.contains(&c.to_lowercase()))
            {
                kept.push(r);
            }
        }
        restaurants = kept;
    }

    if !search.dietary.is_empty() {
        let matching =
            crate::core::menu::restaurant_ids_matching_dietary(db, &search.dietary).await?;
        restaurants.retain(|r| matching.contains(&r.id));
    }

    Ok(restaurants)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::customer::DietaryTag;
    use crate::core::menu::{MenuItemInput, create_menu_item};
    use crate::test_utils::*;

    #[test]
    fn test_cuisines_round_trip() -> Result<()> {
        let cuisines = vec!["Indian".to_string(), "Chinese".to_string()];
        let encoded = encode_cuisines(&cuisines)?;
        let now = Utc::now();
        let model = restaurant::Model {
            id: 1,
            owner_id: 1,
            name: "R".into(),
            description: None,
            location: "L".into(),
            cuisines: encoded,
            image_path: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(decode_cuisines(&model)?, cuisines);
        Ok(())
    }

    #[test]
    fn test_cuisines_round_trip_is_lossless() -> Result<()> {
        let now = Utc::now();
        for cuisines in [
            vec![" Thai ".to_string(), String::new(), "  ".to_string()],
            vec!["Dim \"Sum\"".to_string(), "Caf\u{e9}, Bistro".to_string()],
            Vec::new(),
        ] {
            let model = restaurant::Model {
                id: 1,
                owner_id: 1,
                name: "R".into(),
                description: None,
                location: "L".into(),
                cuisines: encode_cuisines(&cuisines)?,
                image_path: None,
                created_at: now,
                updated_at: now,
            };
            assert_eq!(decode_cuisines(&model)?, cuisines);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_restaurant_validation() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let result = create_restaurant(
            &fixture.db,
            fixture.owner.id,
            RestaurantInput {
                name: "  ".into(),
                location: "Delhi".into(),
                ..Default::default()
            },
            None,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = create_restaurant(
            &fixture.db,
            fixture.owner.id,
            RestaurantInput {
                name: "Name".into(),
                location: String::new(),
                ..Default::default()
            },
            None,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_requires_ownership() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let (_, intruder) =
            crate::core::identity::register_owner(&fixture.db, test_account("intruder")).await?;

        let input = RestaurantInput {
            name: "Hijacked".into(),
            location: "Nowhere".into(),
            ..Default::default()
        };
        let result =
            update_restaurant(&fixture.db, intruder.id, fixture.restaurant.id, input.clone()).await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));

        let updated =
            update_restaurant(&fixture.db, fixture.owner.id, fixture.restaurant.id, input).await?;
        assert_eq!(updated.name, "Hijacked");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_restaurant_returns_images() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        set_restaurant_image(db, fixture.owner.id, fixture.restaurant.id, "front.png".into())
            .await?;
        crate::core::menu::set_menu_item_image(
            db,
            fixture.owner.id,
            fixture.item.id,
            "dish.jpg".into(),
        )
        .await?;
        place_test_order(db, fixture.customer.id, &fixture.item, 1).await?;

        let mut images = delete_restaurant(db, fixture.owner.id, fixture.restaurant.id).await?;
        images.sort();
        assert_eq!(images, vec!["dish.jpg".to_string(), "front.png".to_string()]);

        assert!(matches!(
            get_restaurant(db, fixture.restaurant.id).await.unwrap_err(),
            Error::RestaurantNotFound { .. }
        ));
        assert_eq!(MenuItem::find().count(db).await?, 0);
        assert_eq!(Order::find().count(db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_filters() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        let other = create_restaurant(
            db,
            fixture.owner.id,
            RestaurantInput {
                name: "Green Leaf".into(),
                description: None,
                location: "Kolkata".into(),
                cuisines: vec!["Thai".into()],
            },
            None,
        )
        .await?;
        create_menu_item(
            db,
            fixture.owner.id,
            other.id,
            MenuItemInput {
                name: "Tofu Bowl".into(),
                price: 8.0,
                category: "Mains".into(),
                is_vegetarian: true,
                is_vegan: true,
                ..Default::default()
            },
        )
        .await?;

        let by_name = search_restaurants(
            db,
            &RestaurantSearch {
                query: Some("green".into()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_name.iter().map(|r| r.id).collect::<Vec<_>>(), vec![other.id]);

        let by_cuisine = search_restaurants(
            db,
            &RestaurantSearch {
                cuisines: vec!["Indian".into(), "Mexican".into()],
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(
            by_cuisine.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![fixture.restaurant.id]
        );

        let vegan = search_restaurants(
            db,
            &RestaurantSearch {
                dietary: [DietaryTag::Vegan].into_iter().collect(),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(vegan.iter().map(|r| r.id).collect::<Vec<_>>(), vec![other.id]);

        let all = search_restaurants(db, &RestaurantSearch::default()).await?;
        assert_eq!(all.len(), 2);
        Ok(())
    }
}
