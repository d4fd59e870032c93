//! Cart routes, nested under `/api/customer/cart`.
//!
//! Each handler holds the session's cart lock for the whole operation, so requests on one
//! session never interleave. A rejected operation leaves the cart as it was.

use super::AppState;
use super::error::ApiResult;
use super::extract::CustomerUser;
use super::forms::{CartAddForm, CartUpdateForm};
use super::views::OrderDetail;
use crate::core::cart::CartSummary;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(show).delete(clear))
        .route("/cart/items", post(add).put(update))
        .route("/cart/checkout", post(checkout))
}

async fn show(State(state): State<AppState>, user: CustomerUser) -> ApiResult<Json<CartSummary>> {
    let handle = state.sessions.cart(&user.sid)?;
    let cart = handle.lock().await;
    Ok(Json(cart.summary(&state.db).await?))
}

async fn add(
    State(state): State<AppState>,
    user: CustomerUser,
    Json(form): Json<CartAddForm>,
) -> ApiResult<Json<CartSummary>> {
    let handle = state.sessions.cart(&user.sid)?;
    let mut cart = handle.lock().await;
    cart.add(&state.db, form.menu_item_id, form.quantity).await?;
    Ok(Json(cart.summary(&state.db).await?))
}

async fn update(
    State(state): State<AppState>,
    user: CustomerUser,
    Json(form): Json<CartUpdateForm>,
) -> ApiResult<Json<CartSummary>> {
    let handle = state.sessions.cart(&user.sid)?;
    let mut cart = handle.lock().await;
    cart.update(form.menu_item_id, form.quantity)?;
    Ok(Json(cart.summary(&state.db).await?))
}

async fn clear(State(state): State<AppState>, user: CustomerUser) -> ApiResult<StatusCode> {
    state.sessions.cart(&user.sid)?.lock().await.clear();
    Ok(StatusCode::NO_CONTENT)
}

async fn checkout(
    State(state): State<AppState>,
    user: CustomerUser,
) -> ApiResult<(StatusCode, Json<OrderDetail>)> {
    let handle = state.sessions.cart(&user.sid)?;
    let order = {
        let mut cart = handle.lock().await;
        cart.checkout(&state.db, user.customer_id, Utc::now().date_naive())
            .await?
    };
    Ok((
        StatusCode::CREATED,
        Json(OrderDetail::load(&state.db, order).await?),
    ))
}
