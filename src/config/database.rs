//! Database configuration module for `MenuBuddy`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Column indexes declared on the entities and
//! the composite uniqueness constraint on dish ratings are created here as well.

use crate::entities::{
    Customer, DishRating, Feedback, MenuItem, Order, OrderItem, Restaurant, RestaurantOwner, User,
    dish_rating,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/menu_buddy.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Tables are created parents first so that the foreign keys generated from the
/// `belongs_to` relations resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_entity_table(db, &schema, User).await?;
    create_entity_table(db, &schema, Customer).await?;
    create_entity_table(db, &schema, RestaurantOwner).await?;
    create_entity_table(db, &schema, Restaurant).await?;
    create_entity_table(db, &schema, MenuItem).await?;
    create_entity_table(db, &schema, Order).await?;
    create_entity_table(db, &schema, OrderItem).await?;
    create_entity_table(db, &schema, Feedback).await?;
    create_entity_table(db, &schema, DishRating).await?;

    db.execute(builder.build(&dish_rating_unique_index())).await?;

    Ok(())
}

async fn create_entity_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();

    let mut table: TableCreateStatement = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }

    Ok(())
}

/// One rating per dish per order, enforced by the database.
fn dish_rating_unique_index() -> IndexCreateStatement {
    Index::create()
        .name("idx_dish_ratings_order_menu_item")
        .table(DishRating)
        .col(dish_rating::Column::OrderId)
        .col(dish_rating::Column::MenuItemId)
        .unique()
        .if_not_exists()
        .to_owned()
}
