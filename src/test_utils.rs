//! Shared test utilities for `MenuBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{cart::Cart, identity, menu, restaurant},
    entities,
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Account details for `name`.
///
/// # Defaults
/// * `email`: `{name}@example.com`
/// * `password`: "password123"
/// * `name`: same as the username
pub fn test_account(name: &str) -> identity::NewAccount {
    identity::NewAccount {
        username: name.to_string(),
        email: format!("{name}@example.com"),
        password: "password123".to_string(),
        name: name.to_string(),
        phone: None,
        address: None,
    }
}

/// Creates a restaurant for `owner_id` located in "New Delhi".
pub async fn create_test_restaurant(
    db: &DatabaseConnection,
    owner_id: i64,
    name: &str,
    cuisines: &[&str],
) -> Result<entities::restaurant::Model> {
    restaurant::create_restaurant(
        db,
        owner_id,
        restaurant::RestaurantInput {
            name: name.to_string(),
            description: None,
            location: "New Delhi".to_string(),
            cuisines: cuisines.iter().map(ToString::to_string).collect(),
        },
        None,
    )
    .await
}

/// Creates a menu item in category "Mains" with no dietary flags.
pub async fn create_test_menu_item(
    db: &DatabaseConnection,
    owner_id: i64,
    restaurant_id: i64,
    name: &str,
    price: f64,
    is_deal_of_day: bool,
) -> Result<entities::menu_item::Model> {
    menu::create_menu_item(
        db,
        owner_id,
        restaurant_id,
        menu::MenuItemInput {
            name: name.to_string(),
            price,
            category: "Mains".to_string(),
            is_deal_of_day,
            ..Default::default()
        },
    )
    .await
}

/// A database with one owner, one customer, one restaurant and one dish.
pub struct Fixture {
    /// The database
    pub db: DatabaseConnection,
    /// Owner's login
    pub owner_user: entities::user::Model,
    /// Owner's profile
    pub owner: entities::restaurant_owner::Model,
    /// Customer's login
    pub customer_user: entities::user::Model,
    /// Customer's profile
    pub customer: entities::customer::Model,
    /// "Spice Route", Indian cuisine
    pub restaurant: entities::restaurant::Model,
    /// "Butter Chicken" at 10.99
    pub item: entities::menu_item::Model,
}

/// Sets up the standard [`Fixture`].
pub async fn setup_with_menu() -> Result<Fixture> {
    let db = setup_test_db().await?;
    let (owner_user, owner) = identity::register_owner(&db, test_account("chef")).await?;
    let (customer_user, customer) =
        identity::register_customer(&db, test_account("diner")).await?;
    let restaurant = create_test_restaurant(&db, owner.id, "Spice Route", &["Indian"]).await?;
    let item =
        create_test_menu_item(&db, owner.id, restaurant.id, "Butter Chicken", 10.99, false).await?;

    Ok(Fixture {
        db,
        owner_user,
        owner,
        customer_user,
        customer,
        restaurant,
        item,
    })
}

/// Checks out a cart holding `quantity` units of `item`.
pub async fn place_test_order(
    db: &DatabaseConnection,
    customer_id: i64,
    item: &entities::menu_item::Model,
    quantity: i32,
) -> Result<entities::order::Model> {
    let mut cart = Cart::default();
    cart.add(db, item.id, quantity).await?;
    cart.checkout(db, customer_id, Utc::now().date_naive()).await
}

/// Marks an order completed without going through the owner checks.
pub async fn complete_order(
    db: &DatabaseConnection,
    order_id: i64,
) -> Result<entities::order::Model> {
    let order = crate::core::order::get_order(db, order_id).await?;
    let mut active: entities::order::ActiveModel = order.into();
    active.status = Set(crate::core::order::OrderStatus::Completed.as_str().to_string());
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}
