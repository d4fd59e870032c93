//! End-to-end tests driving the router in-process.

#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use menu_buddy::{
    api::{self, AppState},
    config::{database, server::ServerConfig},
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    _uploads: tempfile::TempDir,
}

async fn spawn_app() -> TestApp {
    let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
    database::create_tables(&db).await.unwrap();
    let uploads = tempfile::tempdir().unwrap();
    let config = ServerConfig::for_tests(uploads.path().to_path_buf());
    TestApp {
        router: api::router(AppState::new(db, config)),
        _uploads: uploads,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register_and_login(&self, username: &str, role: &str) -> String {
        let (status, _) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "password123",
                    "confirm_password": "password123",
                    "role": role,
                    "name": username,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"username": username, "password": "password123", "role": role})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_restaurant(&self, token: &str, name: &str) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/owner/restaurants",
                Some(token),
                Some(json!({"name": name, "location": "New Delhi", "cuisines": ["Indian"]})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    async fn create_item(&self, token: &str, restaurant_id: i64, name: &str, price: f64) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                &format!("/api/owner/restaurants/{restaurant_id}/menu"),
                Some(token),
                Some(json!({"name": name, "price": price, "category": "Mains"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_matching_role() {
    let app = spawn_app().await;
    let (status, _) = app.send(Method::GET, "/api/customer/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let customer = app.register_and_login("diner", "customer").await;
    let (status, body) = app
        .send(Method::GET, "/api/owner/dashboard", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied.");
}

#[tokio::test]
async fn wrong_role_login_is_rejected() {
    let app = spawn_app().await;
    app.register_and_login("chef", "owner").await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "chef", "password": "password123", "role": "customer"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_and_feedback_flow() {
    let app = spawn_app().await;
    let owner = app.register_and_login("chef", "owner").await;
    let restaurant_id = app.create_restaurant(&owner, "Spice Route").await;
    let item_id = app.create_item(&owner, restaurant_id, "Butter Chicken", 10.99).await;

    let customer = app.register_and_login("diner", "customer").await;
    let (status, cart) = app
        .send(
            Method::POST,
            "/api/customer/cart/items",
            Some(&customer),
            Some(json!({"menu_item_id": item_id, "quantity": 2})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!((cart["total"].as_f64().unwrap() - 21.98).abs() < 1e-9);

    let (status, order) = app
        .send(Method::POST, "/api/customer/cart/checkout", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = order["order"]["id"].as_i64().unwrap();
    assert_eq!(order["order"]["status"], "pending");
    assert!((order["order"]["total_amount"].as_f64().unwrap() - 21.98).abs() < 1e-9);
    assert_eq!(order["lines"][0]["quantity"], 2);

    let (_, cart) = app
        .send(Method::GET, "/api/customer/cart", Some(&customer), None)
        .await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 0);

    // Feedback before completion is refused.
    let feedback_uri = format!("/api/customer/orders/{order_id}/feedback");
    let (status, _) = app
        .send(
            Method::POST,
            &feedback_uri,
            Some(&customer),
            Some(json!({"rating": 4, "message": "Tasty"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/api/owner/orders/{order_id}/status"),
            Some(&owner),
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["order"]["status_label"], "Completed");

    let (status, feedback) = app
        .send(
            Method::POST,
            &feedback_uri,
            Some(&customer),
            Some(json!({"rating": "9", "message": "Tasty"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(feedback["rating"], 5);

    let (status, _) = app
        .send(
            Method::POST,
            &feedback_uri,
            Some(&customer),
            Some(json!({"rating": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, pending) = app
        .send(Method::GET, "/api/owner/feedback?pending=true", Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cart_rejects_second_restaurant() {
    let app = spawn_app().await;
    let owner = app.register_and_login("chef", "owner").await;
    let first = app.create_restaurant(&owner, "Spice Route").await;
    let second = app.create_restaurant(&owner, "Taco Town").await;
    let curry = app.create_item(&owner, first, "Curry", 8.0).await;
    let taco = app.create_item(&owner, second, "Taco", 3.0).await;

    let customer = app.register_and_login("diner", "customer").await;
    app.send(
        Method::POST,
        "/api/customer/cart/items",
        Some(&customer),
        Some(json!({"menu_item_id": curry})),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/customer/cart/items",
            Some(&customer),
            Some(json!({"menu_item_id": taco})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("one restaurant at a time"));

    let (_, cart) = app
        .send(Method::GET, "/api/customer/cart", Some(&customer), None)
        .await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart["lines"][0]["menu_item_id"], curry);
}

#[tokio::test]
async fn logout_invalidates_token() {
    let app = spawn_app().await;
    let customer = app.register_and_login("diner", "customer").await;

    let (status, _) = app
        .send(Method::POST, "/api/auth/logout", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::GET, "/api/customer/dashboard", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn menu_item_form_defaults_to_vegetarian() {
    let app = spawn_app().await;
    let owner = app.register_and_login("chef", "owner").await;
    let restaurant_id = app.create_restaurant(&owner, "Spice Route").await;

    let (_, veg) = app
        .send(
            Method::POST,
            &format!("/api/owner/restaurants/{restaurant_id}/menu"),
            Some(&owner),
            Some(json!({"name": "Dal", "price": 4.0, "category": "Mains"})),
        )
        .await;
    assert_eq!(veg["is_vegetarian"], true);

    let (_, meat) = app
        .send(
            Method::POST,
            &format!("/api/owner/restaurants/{restaurant_id}/menu"),
            Some(&owner),
            Some(json!({
                "name": "Kebab",
                "price": 6.0,
                "category": "Mains",
                "non_vegetarian": true,
            })),
        )
        .await;
    assert_eq!(meat["is_vegetarian"], false);
}

#[tokio::test]
async fn double_checkout_places_one_order() {
    let app = spawn_app().await;
    let owner = app.register_and_login("chef", "owner").await;
    let restaurant_id = app.create_restaurant(&owner, "Spice Route").await;
    let item_id = app.create_item(&owner, restaurant_id, "Butter Chicken", 10.99).await;

    let customer = app.register_and_login("diner", "customer").await;
    app.send(
        Method::POST,
        "/api/customer/cart/items",
        Some(&customer),
        Some(json!({"menu_item_id": item_id, "quantity": 2})),
    )
    .await;

    let (first, second) = tokio::join!(
        app.send(Method::POST, "/api/customer/cart/checkout", Some(&customer), None),
        app.send(Method::POST, "/api/customer/cart/checkout", Some(&customer), None),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let (_, orders) = app
        .send(Method::GET, "/api/customer/orders", Some(&customer), None)
        .await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_account_invalidates_token() {
    let app = spawn_app().await;
    let customer = app.register_and_login("diner", "customer").await;

    let (status, _) = app
        .send(Method::DELETE, "/api/customer/profile", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::GET, "/api/customer/cart", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
