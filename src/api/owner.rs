//! Restaurant owner routes under `/api/owner`.

use super::AppState;
use super::error::ApiResult;
use super::extract::OwnerUser;
use super::forms::{
    FeedbackQuery, MenuItemForm, MenuQuery, OwnerOrdersQuery, ReportQuery, ResponseForm,
    RestaurantForm, StatusForm, parse_status_filter,
};
use super::uploads;
use super::views::{OrderDetail, OrderView, RestaurantView};
use crate::core::{
    feedback, menu, order,
    report::{self, RestaurantReport},
    restaurant,
};
use crate::entities::{feedback as feedback_entity, menu_item, restaurant_owner};
use crate::errors::Result;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::{Duration, NaiveTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::path::Path as FsPath;

const DASHBOARD_ORDERS: usize = 10;

/// Routes under `/api/owner`.
pub fn router() -> Router<AppState> {
    Router::new().nest("/api/owner", routes())
}

fn routes() -> Router<AppState> {
    let uploads = Router::new()
        .route("/restaurants/{id}/image", post(upload_restaurant_image))
        .route("/menu-items/{id}/image", post(upload_menu_item_image))
        .layer(DefaultBodyLimit::max(uploads::MAX_IMAGE_BYTES + 64 * 1024));

    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/profile", axum::routing::delete(delete_account))
        .route("/restaurants", get(list_restaurants).post(create_restaurant))
        .route(
            "/restaurants/{id}",
            get(get_restaurant).put(update_restaurant).delete(delete_restaurant),
        )
        .route("/restaurants/{id}/menu", get(list_menu).post(create_menu_item))
        .route("/restaurants/{id}/report", get(restaurant_report))
        .route("/menu-items/{id}", put(update_menu_item).delete(delete_menu_item))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(order_detail))
        .route("/orders/{id}/status", put(update_order_status))
        .route("/feedback", get(list_feedback))
        .route("/feedback/{id}/response", post(respond_to_feedback))
        .merge(uploads)
}

#[derive(Debug, Serialize)]
struct Dashboard {
    owner: restaurant_owner::Model,
    restaurants: Vec<RestaurantView>,
    recent_orders: Vec<OrderView>,
    pending_feedback: usize,
}

async fn dashboard(State(state): State<AppState>, user: OwnerUser) -> ApiResult<Json<Dashboard>> {
    let db = &state.db;
    let owner = crate::core::identity::owner_profile(db, user.user_id).await?;
    let restaurants = restaurant::list_owner_restaurants(db, user.owner_id).await?;
    let mut orders = order::list_owner_orders(db, user.owner_id, None, None).await?;
    orders.truncate(DASHBOARD_ORDERS);
    let pending_feedback = feedback::feedback_for_owner(db, user.owner_id, true).await?.len();

    Ok(Json(Dashboard {
        owner,
        restaurants: RestaurantView::load_all(db, restaurants).await?,
        recent_orders: OrderView::from_pairs(orders),
        pending_feedback,
    }))
}

async fn delete_account(
    State(state): State<AppState>,
    user: OwnerUser,
) -> ApiResult<StatusCode> {
    let images = crate::core::identity::delete_user(&state.db, user.user_id).await?;
    state.sessions.close_user(user.user_id);
    uploads::remove_images(&state.config.upload_dir, images).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_restaurants(
    State(state): State<AppState>,
    user: OwnerUser,
) -> ApiResult<Json<Vec<RestaurantView>>> {
    let restaurants = restaurant::list_owner_restaurants(&state.db, user.owner_id).await?;
    Ok(Json(RestaurantView::load_all(&state.db, restaurants).await?))
}

async fn create_restaurant(
    State(state): State<AppState>,
    user: OwnerUser,
    Json(form): Json<RestaurantForm>,
) -> ApiResult<(StatusCode, Json<RestaurantView>)> {
    let created =
        restaurant::create_restaurant(&state.db, user.owner_id, form.into(), None).await?;
    Ok((
        StatusCode::CREATED,
        Json(RestaurantView::load(&state.db, created).await?),
    ))
}

async fn get_restaurant(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(restaurant_id): Path<i64>,
) -> ApiResult<Json<RestaurantView>> {
    let found = restaurant::get_owned_restaurant(&state.db, user.owner_id, restaurant_id).await?;
    Ok(Json(RestaurantView::load(&state.db, found).await?))
}

async fn update_restaurant(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(restaurant_id): Path<i64>,
    Json(form): Json<RestaurantForm>,
) -> ApiResult<Json<RestaurantView>> {
    let updated =
        restaurant::update_restaurant(&state.db, user.owner_id, restaurant_id, form.into()).await?;
    Ok(Json(RestaurantView::load(&state.db, updated).await?))
}

async fn delete_restaurant(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(restaurant_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let images = restaurant::delete_restaurant(&state.db, user.owner_id, restaurant_id).await?;
    uploads::remove_images(&state.config.upload_dir, images).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Stores an upload, points a record at it and removes the image it replaced.
/// The new file is removed again when the record update fails.
async fn replace_image<T, F, Fut>(upload_dir: &FsPath, multipart: Multipart, attach: F) -> Result<T>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<(T, Option<String>)>>,
{
    let stored = uploads::save_image(upload_dir, multipart).await?;
    match attach(stored.clone()).await {
        Ok((model, previous)) => {
            if let Some(previous) = previous {
                uploads::remove_image(upload_dir, &previous).await;
            }
            Ok(model)
        }
        Err(e) => {
            uploads::remove_image(upload_dir, &stored).await;
            Err(e)
        }
    }
}

async fn upload_restaurant_image(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(restaurant_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<RestaurantView>> {
    let db = &state.db;
    restaurant::get_owned_restaurant(db, user.owner_id, restaurant_id).await?;
    let updated = replace_image(&state.config.upload_dir, multipart, |name| {
        restaurant::set_restaurant_image(db, user.owner_id, restaurant_id, name)
    })
    .await?;
    Ok(Json(RestaurantView::load(db, updated).await?))
}

async fn list_menu(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(restaurant_id): Path<i64>,
    Query(query): Query<MenuQuery>,
) -> ApiResult<Json<Vec<menu_item::Model>>> {
    restaurant::get_owned_restaurant(&state.db, user.owner_id, restaurant_id).await?;
    let items = menu::list_menu_items(&state.db, restaurant_id, &query.into_filter()?).await?;
    Ok(Json(items))
}

async fn create_menu_item(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(restaurant_id): Path<i64>,
    Json(form): Json<MenuItemForm>,
) -> ApiResult<(StatusCode, Json<menu_item::Model>)> {
    let item =
        menu::create_menu_item(&state.db, user.owner_id, restaurant_id, form.into()).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_menu_item(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(item_id): Path<i64>,
    Json(form): Json<MenuItemForm>,
) -> ApiResult<Json<menu_item::Model>> {
    let item = menu::update_menu_item(&state.db, user.owner_id, item_id, form.into()).await?;
    Ok(Json(item))
}

async fn delete_menu_item(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(item_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let image = menu::delete_menu_item(&state.db, user.owner_id, item_id).await?;
    uploads::remove_images(&state.config.upload_dir, image).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_menu_item_image(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(item_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<menu_item::Model>> {
    let db = &state.db;
    menu::get_owned_menu_item(db, user.owner_id, item_id).await?;
    let updated = replace_image(&state.config.upload_dir, multipart, |name| {
        menu::set_menu_item_image(db, user.owner_id, item_id, name)
    })
    .await?;
    Ok(Json(updated))
}

async fn list_orders(
    State(state): State<AppState>,
    user: OwnerUser,
    Query(query): Query<OwnerOrdersQuery>,
) -> ApiResult<Json<Vec<OrderView>>> {
    let status = parse_status_filter(query.status.as_deref())?;
    let orders =
        order::list_owner_orders(&state.db, user.owner_id, status, query.restaurant_id).await?;
    Ok(Json(OrderView::from_pairs(orders)))
}

async fn order_detail(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(order_id): Path<i64>,
) -> ApiResult<Json<OrderDetail>> {
    let found = order::get_order_for_owner(&state.db, user.owner_id, order_id).await?;
    Ok(Json(OrderDetail::load(&state.db, found).await?))
}

async fn update_order_status(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(order_id): Path<i64>,
    Json(form): Json<StatusForm>,
) -> ApiResult<Json<OrderDetail>> {
    let updated = order::update_status(&state.db, user.owner_id, order_id, &form.status).await?;
    Ok(Json(OrderDetail::load(&state.db, updated).await?))
}

async fn restaurant_report(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(restaurant_id): Path<i64>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<RestaurantReport>> {
    let (default_from, default_to) = report::default_window(Utc::now());
    let from = query
        .from
        .map_or(default_from, |d| d.and_time(NaiveTime::MIN).and_utc());
    let to = query.to.map_or(default_to, |d| {
        d.and_time(NaiveTime::MIN).and_utc() + Duration::days(1) - Duration::microseconds(1)
    });
    let report =
        report::restaurant_report(&state.db, user.owner_id, restaurant_id, from, to).await?;
    Ok(Json(report))
}

async fn list_feedback(
    State(state): State<AppState>,
    user: OwnerUser,
    Query(query): Query<FeedbackQuery>,
) -> ApiResult<Json<Vec<feedback_entity::Model>>> {
    let found = feedback::feedback_for_owner(&state.db, user.owner_id, query.pending).await?;
    Ok(Json(found))
}

async fn respond_to_feedback(
    State(state): State<AppState>,
    user: OwnerUser,
    Path(feedback_id): Path<i64>,
    Json(form): Json<ResponseForm>,
) -> ApiResult<Json<feedback_entity::Model>> {
    let updated =
        feedback::respond_to_feedback(&state.db, user.owner_id, feedback_id, &form.response)
            .await?;
    Ok(Json(updated))
}
