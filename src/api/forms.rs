//! Request bodies and query strings, and their conversion into core inputs.
//!
//! List-valued query parameters are comma separated, e.g. `?cuisines=Thai,Indian`.

use crate::core::{
    customer::{DietaryRestrictions, DietaryTag, ProfileUpdate},
    menu::{MenuFilter, MenuItemInput},
    order::OrderStatus,
    restaurant::{RestaurantInput, RestaurantSearch},
};
use crate::errors::Result;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_dietary(raw: Option<&str>) -> Result<DietaryRestrictions> {
    split_list(raw).iter().map(|s| s.parse::<DietaryTag>()).collect()
}

/// Parses a status filter; empty and `all` mean no filter.
pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<OrderStatus>> {
    match raw.map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

/// Renders a JSON rating value as the raw text the rating parser expects.
#[must_use]
pub fn raw_rating(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Customer profile edit.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    /// Login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Display name
    pub name: String,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Delivery address
    #[serde(default)]
    pub address: Option<String>,
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        Self {
            username: form.username,
            email: form.email,
            name: form.name,
            phone: form.phone,
            address: form.address,
        }
    }
}

/// Favorite cuisines and dietary restrictions.
#[derive(Debug, Deserialize)]
pub struct PreferencesForm {
    /// Favorite cuisines
    #[serde(default)]
    pub favorite_cuisines: Vec<String>,
    /// Dietary restrictions
    #[serde(default)]
    pub dietary_restrictions: DietaryRestrictions,
}

/// Restaurant create or edit.
#[derive(Debug, Deserialize)]
pub struct RestaurantForm {
    /// Restaurant name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Address or area
    pub location: String,
    /// Cuisine tags
    #[serde(default)]
    pub cuisines: Vec<String>,
}

impl From<RestaurantForm> for RestaurantInput {
    /// Cuisine tags are trimmed and blank ones dropped.
    fn from(form: RestaurantForm) -> Self {
        Self {
            name: form.name,
            description: form.description,
            location: form.location,
            cuisines: form
                .cuisines
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Restaurant search query.
#[derive(Debug, Default, Deserialize)]
pub struct RestaurantQuery {
    /// Name substring
    pub q: Option<String>,
    /// Location substring
    pub location: Option<String>,
    /// Comma separated cuisines
    pub cuisines: Option<String>,
    /// Comma separated dietary tags
    pub dietary: Option<String>,
}

impl RestaurantQuery {
    /// Converts into a core search.
    pub fn into_search(self) -> Result<RestaurantSearch> {
        Ok(RestaurantSearch {
            dietary: parse_dietary(self.dietary.as_deref())?,
            cuisines: split_list(self.cuisines.as_deref()),
            query: self.q,
            location: self.location,
        })
    }
}

/// Menu filter query.
#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
    /// Name or description substring
    pub search: Option<String>,
    /// Lowest price
    pub min_price: Option<f64>,
    /// Highest price
    pub max_price: Option<f64>,
    /// Exact category
    pub category: Option<String>,
    /// Comma separated dietary tags
    pub dietary: Option<String>,
}

impl MenuQuery {
    /// Converts into a core filter.
    pub fn into_filter(self) -> Result<MenuFilter> {
        Ok(MenuFilter {
            dietary: parse_dietary(self.dietary.as_deref())?,
            search: self.search,
            min_price: self.min_price,
            max_price: self.max_price,
            category: self.category,
        })
    }
}

/// Menu item create/edit form.
///
/// Items are vegetarian unless `non_vegetarian` is ticked.
#[derive(Debug, Deserialize)]
pub struct MenuItemForm {
    /// Dish name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Price
    pub price: f64,
    /// Menu section
    pub category: String,
    /// Inverse of `is_vegetarian`
    #[serde(default)]
    pub non_vegetarian: bool,
    /// Vegan
    #[serde(default)]
    pub is_vegan: bool,
    /// Guilt free
    #[serde(default)]
    pub is_guilt_free: bool,
    /// Chef's special
    #[serde(default)]
    pub is_special: bool,
    /// Deal of the day
    #[serde(default)]
    pub is_deal_of_day: bool,
}

impl From<MenuItemForm> for MenuItemInput {
    fn from(form: MenuItemForm) -> Self {
        Self {
            name: form.name,
            description: form.description,
            price: form.price,
            category: form.category,
            is_vegetarian: !form.non_vegetarian,
            is_vegan: form.is_vegan,
            is_guilt_free: form.is_guilt_free,
            is_special: form.is_special,
            is_deal_of_day: form.is_deal_of_day,
        }
    }
}

const fn one() -> i32 {
    1
}

/// Add-to-cart form.
#[derive(Debug, Deserialize)]
pub struct CartAddForm {
    /// Menu item
    pub menu_item_id: i64,
    /// Units to add
    #[serde(default = "one")]
    pub quantity: i32,
}

/// Cart line update form.
#[derive(Debug, Deserialize)]
pub struct CartUpdateForm {
    /// Menu item
    pub menu_item_id: i64,
    /// New quantity; zero removes the line
    pub quantity: i32,
}

/// Order feedback form.
#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    /// Star rating, number or string
    #[serde(default)]
    pub rating: Value,
    /// Comment
    #[serde(default)]
    pub message: Option<String>,
}

/// Dish ratings keyed by menu item id.
#[derive(Debug, Deserialize)]
pub struct DishRatingsForm {
    /// Menu item id to star rating
    #[serde(default)]
    pub ratings: BTreeMap<i64, Value>,
}

impl DishRatingsForm {
    /// Raw rating text per menu item.
    #[must_use]
    pub fn raw(&self) -> BTreeMap<i64, String> {
        self.ratings
            .iter()
            .map(|(id, value)| (*id, raw_rating(value)))
            .collect()
    }
}

/// Customer order list query.
#[derive(Debug, Default, Deserialize)]
pub struct CustomerOrdersQuery {
    /// Order id or restaurant name substring
    pub search: Option<String>,
    /// Status filter
    pub status: Option<String>,
}

/// Owner order list query.
#[derive(Debug, Default, Deserialize)]
pub struct OwnerOrdersQuery {
    /// Status filter
    pub status: Option<String>,
    /// Restrict to one restaurant
    pub restaurant_id: Option<i64>,
}

/// Order status change.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    /// New status
    pub status: String,
}

/// Owner reply to feedback.
#[derive(Debug, Deserialize)]
pub struct ResponseForm {
    /// Reply text
    pub response: String,
}

/// Feedback list query.
#[derive(Debug, Default, Deserialize)]
pub struct FeedbackQuery {
    /// Only unresolved feedback
    #[serde(default)]
    pub pending: bool,
}

/// Report window; defaults to the last 30 days.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// First day, inclusive
    pub from: Option<NaiveDate>,
    /// Last day, inclusive
    pub to: Option<NaiveDate>,
}
