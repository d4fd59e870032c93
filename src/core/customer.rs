//! Customer business logic - profile, preferences, dietary restrictions and favorites.
//!
//! Preferences and dietary restrictions live in JSON text columns. The functions here are the
//! only place that encodes or decodes them; a round trip through `set_*` and `get_*` returns
//! exactly the value that was stored.

use crate::{
    entities::{Customer, Restaurant, customer, restaurant, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Dietary tag shared by menu item flags and customer restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryTag {
    /// Matches `is_vegetarian`
    Vegetarian,
    /// Matches `is_vegan`
    Vegan,
    /// Matches `is_guilt_free`
    GuiltFree,
}

impl DietaryTag {
    /// Every tag, in display order.
    pub const ALL: [Self; 3] = [Self::Vegetarian, Self::Vegan, Self::GuiltFree];

    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::GuiltFree => "guilt_free",
        }
    }
}

impl fmt::Display for DietaryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DietaryTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown dietary tag: {s}")))
    }
}

/// Set of dietary tags.
pub type DietaryRestrictions = BTreeSet<DietaryTag>;

/// Preferences blob stored on the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Cuisine tags the customer likes
    #[serde(default)]
    pub favorite_cuisines: Vec<String>,
    /// Favorite restaurant ids, without duplicates, in insertion order
    #[serde(default)]
    pub favorite_restaurants: Vec<i64>,
}

/// Profile fields editable by the customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    /// Login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Display name
    pub name: String,
    /// Phone number
    pub phone: Option<String>,
    /// Delivery address
    pub address: Option<String>,
}

/// Decodes the preferences column. A missing value is the default blob.
pub fn get_preferences(customer: &customer::Model) -> Result<Preferences> {
    match customer.preferences.as_deref() {
        None | Some("") => Ok(Preferences::default()),
        Some(raw) => serde_json::from_str(raw).map_err(Into::into),
    }
}

/// Encodes preferences into the column value.
pub fn set_preferences(
    customer: &mut customer::ActiveModel,
    preferences: &Preferences,
) -> Result<()> {
    customer.preferences = Set(Some(serde_json::to_string(preferences)?));
    Ok(())
}

/// Decodes the dietary restriction column. A missing value is the empty set.
pub fn get_dietary_restrictions(customer: &customer::Model) -> Result<DietaryRestrictions> {
    match customer.dietary_restrictions.as_deref() {
        None | Some("") => Ok(DietaryRestrictions::new()),
        Some(raw) => serde_json::from_str(raw).map_err(Into::into),
    }
}

/// Encodes dietary restrictions into the column value.
pub fn set_dietary_restrictions(
    customer: &mut customer::ActiveModel,
    restrictions: &DietaryRestrictions,
) -> Result<()> {
    customer.dietary_restrictions = Set(Some(serde_json::to_string(restrictions)?));
    Ok(())
}

/// Finds a customer profile by id.
pub async fn get_customer<C>(db: &C, customer_id: i64) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    Customer::find_by_id(customer_id)
        .one(db)
        .await?
        .ok_or(Error::CustomerNotFound { id: customer_id })
}

async fn save_preferences<C>(
    db: &C,
    customer: customer::Model,
    preferences: &Preferences,
) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    let mut active: customer::ActiveModel = customer.into();
    set_preferences(&mut active, preferences)?;
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Adds a restaurant to the customer's favorites.
///
/// Returns `false` when it was already a favorite; the list never holds a
/// restaurant twice.
pub async fn add_to_favorites<C>(db: &C, customer_id: i64, restaurant_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let customer = get_customer(db, customer_id).await?;
    let mut prefs = get_preferences(&customer)?;

    if prefs.favorite_restaurants.contains(&restaurant_id) {
        return Ok(false);
    }
    prefs.favorite_restaurants.push(restaurant_id);
    save_preferences(db, customer, &prefs).await?;
    Ok(true)
}

/// Removes a restaurant from the customer's favorites.
///
/// Returns `false` when it was not a favorite.
pub async fn remove_from_favorites<C>(
    db: &C,
    customer_id: i64,
    restaurant_id: i64,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let customer = get_customer(db, customer_id).await?;
    let mut prefs = get_preferences(&customer)?;

    let before = prefs.favorite_restaurants.len();
    prefs.favorite_restaurants.retain(|id| *id != restaurant_id);
    if prefs.favorite_restaurants.len() == before {
        return Ok(false);
    }
    save_preferences(db, customer, &prefs).await?;
    Ok(true)
}

/// True when the restaurant is among the customer's favorites.
pub fn is_favorite(customer: &customer::Model, restaurant_id: i64) -> Result<bool> {
    Ok(get_preferences(customer)?
        .favorite_restaurants
        .contains(&restaurant_id))
}

/// Flips the favorite state of a restaurant and returns the new state.
pub async fn toggle_favorite<C>(db: &C, customer_id: i64, restaurant_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Restaurant::find_by_id(restaurant_id)
        .one(db)
        .await?
        .ok_or(Error::RestaurantNotFound { id: restaurant_id })?;

    let customer = get_customer(db, customer_id).await?;
    if is_favorite(&customer, restaurant_id)? {
        remove_from_favorites(db, customer_id, restaurant_id).await?;
        Ok(false)
    } else {
        add_to_favorites(db, customer_id, restaurant_id).await?;
        Ok(true)
    }
}

/// Favorite restaurants that still exist.
pub async fn favorite_restaurants<C>(
    db: &C,
    customer: &customer::Model,
) -> Result<Vec<restaurant::Model>>
where
    C: ConnectionTrait,
{
    let prefs = get_preferences(customer)?;
    if prefs.favorite_restaurants.is_empty() {
        return Ok(Vec::new());
    }
    Restaurant::find()
        .filter(restaurant::Column::Id.is_in(prefs.favorite_restaurants))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces favorite cuisines and dietary restrictions, keeping favorite
/// restaurants as they are.
pub async fn update_preferences<C>(
    db: &C,
    customer_id: i64,
    favorite_cuisines: Vec<String>,
    restrictions: &DietaryRestrictions,
) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    let customer = get_customer(db, customer_id).await?;
    let mut prefs = get_preferences(&customer)?;
    prefs.favorite_cuisines = favorite_cuisines;

    let mut active: customer::ActiveModel = customer.into();
    set_preferences(&mut active, &prefs)?;
    set_dietary_restrictions(&mut active, restrictions)?;
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    info!("Customer preferences updated: {}", updated.id);
    Ok(updated)
}

/// Updates the account and profile fields of a customer in one transaction.
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: i64,
    update: ProfileUpdate,
) -> Result<(user::Model, customer::Model)> {
    if update.name.trim().is_empty() {
        return Err(Error::validation("Name cannot be empty"));
    }

    let txn = db.begin().await?;
    let user =
        crate::core::identity::update_account(&txn, user_id, &update.username, &update.email)
            .await?;
    let customer = crate::core::identity::customer_profile(&txn, user_id).await?;

    let mut active: customer::ActiveModel = customer.into();
    active.name = Set(update.name.trim().to_string());
    active.phone = Set(update.phone);
    active.address = Set(update.address);
    active.updated_at = Set(Utc::now());
    let customer = active.update(&txn).await?;
    txn.commit().await?;

    info!("Customer profile updated: {}", user.username);
    Ok((user, customer))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn blank_customer() -> customer::Model {
        let now = Utc::now();
        customer::Model {
            id: 1,
            user_id: 1,
            name: "Test".to_string(),
            address: None,
            phone: None,
            preferences: None,
            dietary_restrictions: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(model: &customer::Model, active: &customer::ActiveModel) -> customer::Model {
        let mut out = model.clone();
        if let sea_orm::ActiveValue::Set(v) = &active.preferences {
            out.preferences.clone_from(v);
        }
        if let sea_orm::ActiveValue::Set(v) = &active.dietary_restrictions {
            out.dietary_restrictions.clone_from(v);
        }
        out
    }

    #[test]
    fn test_preferences_round_trip() -> Result<()> {
        let model = blank_customer();
        let prefs = Preferences {
            favorite_cuisines: vec!["Italian".into(), "Mexican".into(), "Thai".into()],
            favorite_restaurants: vec![1, 3, 5],
        };

        let mut active: customer::ActiveModel = model.clone().into();
        set_preferences(&mut active, &prefs)?;
        assert_eq!(get_preferences(&apply(&model, &active))?, prefs);

        let empty = Preferences::default();
        set_preferences(&mut active, &empty)?;
        assert_eq!(get_preferences(&apply(&model, &active))?, empty);
        Ok(())
    }

    #[test]
    fn test_dietary_restrictions_round_trip() -> Result<()> {
        let model = blank_customer();
        assert!(get_dietary_restrictions(&model)?.is_empty());

        let restrictions: DietaryRestrictions =
            [DietaryTag::Vegan, DietaryTag::GuiltFree].into_iter().collect();
        let mut active: customer::ActiveModel = model.clone().into();
        set_dietary_restrictions(&mut active, &restrictions)?;

        let stored = apply(&model, &active);
        assert_eq!(
            stored.dietary_restrictions.as_deref(),
            Some(r#"["vegan","guilt_free"]"#)
        );
        assert_eq!(get_dietary_restrictions(&stored)?, restrictions);
        Ok(())
    }

    #[test]
    fn test_dietary_tag_parsing() {
        assert_eq!("guilt_free".parse::<DietaryTag>().unwrap(), DietaryTag::GuiltFree);
        assert!("keto".parse::<DietaryTag>().is_err());
    }

    #[test]
    fn test_missing_preferences_decode_as_default() -> Result<()> {
        let mut model = blank_customer();
        model.preferences = Some(r#"{"favorite_cuisines":["Thai"]}"#.to_string());
        let prefs = get_preferences(&model)?;
        assert_eq!(prefs.favorite_cuisines, vec!["Thai".to_string()]);
        assert!(prefs.favorite_restaurants.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_favorites_is_idempotent() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let (db, customer_id, restaurant_id) =
            (&fixture.db, fixture.customer.id, fixture.restaurant.id);

        assert!(add_to_favorites(db, customer_id, restaurant_id).await?);
        assert!(!add_to_favorites(db, customer_id, restaurant_id).await?);

        let customer = get_customer(db, customer_id).await?;
        let prefs = get_preferences(&customer)?;
        assert_eq!(prefs.favorite_restaurants, vec![restaurant_id]);
        assert!(is_favorite(&customer, restaurant_id)?);
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_and_remove_favorites() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let (db, customer_id, restaurant_id) =
            (&fixture.db, fixture.customer.id, fixture.restaurant.id);

        assert!(toggle_favorite(db, customer_id, restaurant_id).await?);
        let customer = get_customer(db, customer_id).await?;
        assert_eq!(favorite_restaurants(db, &customer).await?.len(), 1);

        assert!(!toggle_favorite(db, customer_id, restaurant_id).await?);
        assert!(!remove_from_favorites(db, customer_id, restaurant_id).await?);

        let missing = toggle_favorite(db, customer_id, 999).await;
        assert!(matches!(missing.unwrap_err(), Error::RestaurantNotFound { id: 999 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_preferences_keeps_favorites() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;
        add_to_favorites(db, fixture.customer.id, fixture.restaurant.id).await?;

        let restrictions: DietaryRestrictions = [DietaryTag::Vegetarian].into_iter().collect();
        let updated =
            update_preferences(db, fixture.customer.id, vec!["Indian".into()], &restrictions)
                .await?;

        let prefs = get_preferences(&updated)?;
        assert_eq!(prefs.favorite_cuisines, vec!["Indian".to_string()]);
        assert_eq!(prefs.favorite_restaurants, vec![fixture.restaurant.id]);
        assert_eq!(get_dietary_restrictions(&updated)?, restrictions);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_profile() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let (user, customer) = update_profile(
            &fixture.db,
            fixture.customer_user.id,
            ProfileUpdate {
                username: "renamed".into(),
                email: "renamed@example.com".into(),
                name: "Anita Verma".into(),
                phone: Some("9898989898".into()),
                address: Some("55 Park Street".into()),
            },
        )
        .await?;

        assert_eq!(user.username, "renamed");
        assert_eq!(customer.name, "Anita Verma");
        assert_eq!(customer.address.as_deref(), Some("55 Park Street"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_profile_is_all_or_nothing() -> Result<()> {
        let fixture = setup_with_menu().await?;
        let db = &fixture.db;

        // An owner has no customer profile, so the second write fails.
        let result = update_profile(
            db,
            fixture.owner_user.id,
            ProfileUpdate {
                username: "renamed".into(),
                email: "renamed@example.com".into(),
                name: "Priya Patel".into(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::CustomerNotFound { .. }));

        let owner = crate::core::identity::get_user_by_id(db, fixture.owner_user.id)
            .await?
            .unwrap();
        assert_eq!(owner.username, fixture.owner_user.username);
        assert_eq!(owner.email, fixture.owner_user.email);
        assert!(
            crate::core::identity::get_user_by_username(db, "renamed")
                .await?
                .is_none()
        );
        Ok(())
    }
}
