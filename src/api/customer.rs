//! Customer routes under `/api/customer`.

use super::AppState;
use super::error::ApiResult;
use super::extract::CustomerUser;
use super::forms::{
    CustomerOrdersQuery, DishRatingsForm, FeedbackForm, MenuQuery, PreferencesForm, ProfileForm,
    RestaurantQuery, parse_status_filter, raw_rating,
};
use super::uploads;
use super::views::{MenuItemView, OrderDetail, OrderView, RestaurantView};
use crate::core::{
    customer::{self, DietaryRestrictions, Preferences},
    feedback, identity, menu, order, recommend,
    recommend::RatedDish,
    restaurant,
};
use crate::entities::{customer as customer_entity, dish_rating, feedback as feedback_entity};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

const RECENT_ORDERS: u64 = 5;

/// Routes under `/api/customer`.
pub fn router() -> Router<AppState> {
    Router::new().nest("/api/customer", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/profile", get(get_profile).put(update_profile).delete(delete_account))
        .route("/preferences", get(get_preferences).put(update_preferences))
        .route("/restaurants", get(search_restaurants))
        .route("/restaurants/{id}", get(restaurant_detail))
        .route("/restaurants/{id}/favorite", post(toggle_favorite))
        .route("/recommendations", get(recommendations))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(order_detail))
        .route("/orders/{id}/feedback", post(submit_feedback))
        .route("/orders/{id}/dish-ratings", post(submit_dish_ratings))
        .merge(super::cart::routes())
}

#[derive(Debug, Serialize)]
struct Dashboard {
    customer: customer_entity::Model,
    recent_orders: Vec<OrderView>,
    recommended_restaurants: Vec<RestaurantView>,
    favorite_restaurants: Vec<RestaurantView>,
}

async fn dashboard(
    State(state): State<AppState>,
    user: CustomerUser,
) -> ApiResult<Json<Dashboard>> {
    let db = &state.db;
    let customer = customer::get_customer(db, user.customer_id).await?;
    let recent = order::recent_customer_orders(db, user.customer_id, RECENT_ORDERS).await?;
    let recommended = recommend::recommend_restaurants(db, user.customer_id).await?;
    let favorites = customer::favorite_restaurants(db, &customer).await?;

    Ok(Json(Dashboard {
        recent_orders: OrderView::from_pairs(recent),
        recommended_restaurants: RestaurantView::load_all(db, recommended).await?,
        favorite_restaurants: RestaurantView::load_all(db, favorites).await?,
        customer,
    }))
}

#[derive(Debug, Serialize)]
struct Profile {
    username: String,
    email: String,
    customer: customer_entity::Model,
}

async fn get_profile(
    State(state): State<AppState>,
    user: CustomerUser,
) -> ApiResult<Json<Profile>> {
    let account = identity::get_user_by_id(&state.db, user.user_id)
        .await?
        .ok_or_else(|| crate::errors::Error::UserNotFound {
            name: user.user_id.to_string(),
        })?;
    let customer = customer::get_customer(&state.db, user.customer_id).await?;
    Ok(Json(Profile {
        username: account.username,
        email: account.email,
        customer,
    }))
}

async fn update_profile(
    State(state): State<AppState>,
    user: CustomerUser,
    Json(form): Json<ProfileForm>,
) -> ApiResult<Json<Profile>> {
    let (account, customer) =
        customer::update_profile(&state.db, user.user_id, form.into()).await?;
    Ok(Json(Profile {
        username: account.username,
        email: account.email,
        customer,
    }))
}

async fn delete_account(
    State(state): State<AppState>,
    user: CustomerUser,
) -> ApiResult<StatusCode> {
    let images = identity::delete_user(&state.db, user.user_id).await?;
    state.sessions.close_user(user.user_id);
    uploads::remove_images(&state.config.upload_dir, images).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct PreferencesView {
    preferences: Preferences,
    dietary_restrictions: DietaryRestrictions,
}

impl PreferencesView {
    fn from_model(customer: &customer_entity::Model) -> crate::errors::Result<Self> {
        Ok(Self {
            preferences: customer::get_preferences(customer)?,
            dietary_restrictions: customer::get_dietary_restrictions(customer)?,
        })
    }
}

async fn get_preferences(
    State(state): State<AppState>,
    user: CustomerUser,
) -> ApiResult<Json<PreferencesView>> {
    let customer = customer::get_customer(&state.db, user.customer_id).await?;
    Ok(Json(PreferencesView::from_model(&customer)?))
}

async fn update_preferences(
    State(state): State<AppState>,
    user: CustomerUser,
    Json(form): Json<PreferencesForm>,
) -> ApiResult<Json<PreferencesView>> {
    let customer = customer::update_preferences(
        &state.db,
        user.customer_id,
        form.favorite_cuisines,
        &form.dietary_restrictions,
    )
    .await?;
    Ok(Json(PreferencesView::from_model(&customer)?))
}

async fn search_restaurants(
    State(state): State<AppState>,
    _user: CustomerUser,
    Query(query): Query<RestaurantQuery>,
) -> ApiResult<Json<Vec<RestaurantView>>> {
    let found = restaurant::search_restaurants(&state.db, &query.into_search()?).await?;
    Ok(Json(RestaurantView::load_all(&state.db, found).await?))
}

#[derive(Debug, Serialize)]
struct RestaurantDetail {
    restaurant: RestaurantView,
    is_favorite: bool,
    menu: BTreeMap<String, Vec<MenuItemView>>,
    categories: Vec<String>,
    price_range: Option<(f64, f64)>,
    recommended_dishes: Vec<RatedDish>,
    feedback: Vec<feedback_entity::Model>,
}

async fn restaurant_detail(
    State(state): State<AppState>,
    user: CustomerUser,
    Path(restaurant_id): Path<i64>,
    Query(query): Query<MenuQuery>,
) -> ApiResult<Json<RestaurantDetail>> {
    let db = &state.db;
    let today = Utc::now().date_naive();
    let model = restaurant::get_restaurant(db, restaurant_id).await?;
    let customer = customer::get_customer(db, user.customer_id).await?;

    let items = menu::list_menu_items(db, restaurant_id, &query.into_filter()?).await?;
    let mut grouped = BTreeMap::new();
    for (category, items) in menu::menu_by_category(items) {
        let mut views = Vec::with_capacity(items.len());
        for item in items {
            views.push(MenuItemView::load(db, item, today).await?);
        }
        grouped.insert(category, views);
    }

    Ok(Json(RestaurantDetail {
        is_favorite: customer::is_favorite(&customer, restaurant_id)?,
        menu: grouped,
        categories: menu::menu_categories(db, restaurant_id).await?,
        price_range: menu::price_range(db, restaurant_id).await?,
        recommended_dishes: recommend::recommend_dishes(db, user.customer_id, restaurant_id).await?,
        feedback: feedback::feedback_for_restaurant(db, restaurant_id).await?,
        restaurant: RestaurantView::load(db, model).await?,
    }))
}

#[derive(Debug, Serialize)]
struct FavoriteState {
    restaurant_id: i64,
    is_favorite: bool,
}

async fn toggle_favorite(
    State(state): State<AppState>,
    user: CustomerUser,
    Path(restaurant_id): Path<i64>,
) -> ApiResult<Json<FavoriteState>> {
    let is_favorite = customer::toggle_favorite(&state.db, user.customer_id, restaurant_id).await?;
    Ok(Json(FavoriteState {
        restaurant_id,
        is_favorite,
    }))
}

async fn recommendations(
    State(state): State<AppState>,
    user: CustomerUser,
) -> ApiResult<Json<Vec<RestaurantView>>> {
    let recommended = recommend::recommend_restaurants(&state.db, user.customer_id).await?;
    Ok(Json(RestaurantView::load_all(&state.db, recommended).await?))
}

async fn list_orders(
    State(state): State<AppState>,
    user: CustomerUser,
    Query(query): Query<CustomerOrdersQuery>,
) -> ApiResult<Json<Vec<OrderView>>> {
    let status = parse_status_filter(query.status.as_deref())?;
    let orders =
        order::list_customer_orders(&state.db, user.customer_id, query.search.as_deref(), status)
            .await?;
    Ok(Json(OrderView::from_pairs(orders)))
}

async fn order_detail(
    State(state): State<AppState>,
    user: CustomerUser,
    Path(order_id): Path<i64>,
) -> ApiResult<Json<OrderDetail>> {
    let order = order::get_order_for_customer(&state.db, user.customer_id, order_id).await?;
    Ok(Json(OrderDetail::load(&state.db, order).await?))
}

async fn submit_feedback(
    State(state): State<AppState>,
    user: CustomerUser,
    Path(order_id): Path<i64>,
    Json(form): Json<FeedbackForm>,
) -> ApiResult<(StatusCode, Json<feedback_entity::Model>)> {
    let saved = feedback::submit_feedback(
        &state.db,
        user.customer_id,
        order_id,
        &raw_rating(&form.rating),
        form.message.as_deref().unwrap_or_default(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn submit_dish_ratings(
    State(state): State<AppState>,
    user: CustomerUser,
    Path(order_id): Path<i64>,
    Json(form): Json<DishRatingsForm>,
) -> ApiResult<(StatusCode, Json<Vec<dish_rating::Model>>)> {
    let saved =
        feedback::submit_dish_ratings(&state.db, user.customer_id, order_id, &form.raw()).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}
