//! Response bodies built from entity models.

use crate::core::{feedback, menu, order, restaurant};
use crate::entities::{dish_rating, feedback as feedback_entity, menu_item, order as order_entity};
use crate::errors::Result;
use chrono::NaiveDate;
use sea_orm::ConnectionTrait;
use serde::Serialize;

/// A restaurant with its decoded cuisine list and rating.
#[derive(Debug, Serialize)]
pub struct RestaurantView {
    /// Restaurant id
    pub id: i64,
    /// Owning profile
    pub owner_id: i64,
    /// Name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Location
    pub location: String,
    /// Cuisine tags
    pub cuisines: Vec<String>,
    /// Stored image file name
    pub image_path: Option<String>,
    /// Average feedback rating
    pub average_rating: Option<f64>,
}

impl RestaurantView {
    /// Builds the view, looking up the average rating.
    pub async fn load<C>(db: &C, model: crate::entities::restaurant::Model) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let cuisines = restaurant::decode_cuisines(&model)?;
        let average_rating = feedback::average_restaurant_rating(db, model.id).await?;
        Ok(Self {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            description: model.description,
            location: model.location,
            cuisines,
            image_path: model.image_path,
            average_rating,
        })
    }

    /// Builds views for a list of restaurants.
    pub async fn load_all<C>(
        db: &C,
        models: Vec<crate::entities::restaurant::Model>,
    ) -> Result<Vec<Self>>
    where
        C: ConnectionTrait,
    {
        let mut views = Vec::with_capacity(models.len());
        for model in models {
            views.push(Self::load(db, model).await?);
        }
        Ok(views)
    }
}

/// A menu item with today's popularity and its rating.
#[derive(Debug, Serialize)]
pub struct MenuItemView {
    /// The item
    #[serde(flatten)]
    pub item: menu_item::Model,
    /// Ordered more than the daily threshold today
    pub mostly_ordered: bool,
    /// Average dish rating
    pub average_rating: Option<f64>,
}

impl MenuItemView {
    /// Builds the view. A stale daily counter is reset on the way.
    pub async fn load<C>(db: &C, item: menu_item::Model, today: NaiveDate) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let mostly_ordered = menu::is_mostly_ordered(db, item.id, today).await?;
        let average_rating = feedback::average_dish_rating(db, item.id).await?;
        Ok(Self {
            item,
            mostly_ordered,
            average_rating,
        })
    }
}

/// An order with its status label and restaurant name.
#[derive(Debug, Serialize)]
pub struct OrderView {
    /// The order
    #[serde(flatten)]
    pub order: order_entity::Model,
    /// Human readable status
    pub status_label: String,
    /// Restaurant name, if the restaurant still exists
    pub restaurant_name: Option<String>,
}

impl OrderView {
    /// Builds the view from an order and its optional restaurant.
    #[must_use]
    pub fn new(
        order: order_entity::Model,
        restaurant: Option<crate::entities::restaurant::Model>,
    ) -> Self {
        let status_label = order
            .status
            .parse::<order::OrderStatus>()
            .map_or_else(|_| order.status.clone(), |s| s.label().to_string());
        Self {
            order,
            status_label,
            restaurant_name: restaurant.map(|r| r.name),
        }
    }

    /// Builds views for `(order, restaurant)` pairs.
    #[must_use]
    pub fn from_pairs(
        pairs: Vec<(order_entity::Model, Option<crate::entities::restaurant::Model>)>,
    ) -> Vec<Self> {
        pairs.into_iter().map(|(o, r)| Self::new(o, r)).collect()
    }
}

/// One line of an order.
#[derive(Debug, Serialize)]
pub struct OrderLineView {
    /// Menu item id
    pub menu_item_id: i64,
    /// Dish name, if the item still exists
    pub name: Option<String>,
    /// Units ordered
    pub quantity: i32,
    /// Unit price paid
    pub price: f64,
    /// `price * quantity`
    pub subtotal: f64,
}

/// Everything shown on an order page.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    /// Header
    pub order: OrderView,
    /// Lines
    pub lines: Vec<OrderLineView>,
    /// Total units
    pub item_count: i64,
    /// Order feedback, if given
    pub feedback: Option<feedback_entity::Model>,
    /// Dish ratings, if given
    pub dish_ratings: Vec<dish_rating::Model>,
}

impl OrderDetail {
    /// Loads lines, feedback and ratings of an order.
    pub async fn load<C>(db: &C, order: order_entity::Model) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let restaurant = match restaurant::get_restaurant(db, order.restaurant_id).await {
            Ok(r) => Some(r),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let lines = order::order_items_with_menu(db, order.id)
            .await?
            .into_iter()
            .map(|(line, item)| OrderLineView {
                menu_item_id: line.menu_item_id,
                name: item.map(|i| i.name),
                quantity: line.quantity,
                price: line.price,
                subtotal: line.subtotal(),
            })
            .collect();
        let item_count = order::item_count(db, order.id).await?;
        let feedback = feedback::feedback_for_order(db, order.id).await?;
        let dish_ratings = feedback::dish_ratings_for_order(db, order.id).await?;

        Ok(Self {
            order: OrderView::new(order, restaurant),
            lines,
            item_count,
            feedback,
            dish_ratings,
        })
    }
}
