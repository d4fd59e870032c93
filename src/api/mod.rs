//! JSON HTTP API built on axum.
//!
//! Handlers are thin: they authenticate the caller, convert request bodies into core inputs,
//! call into [`crate::core`] and serialise the result. Errors go through [`error::AppError`].

pub mod auth;
mod cart;
pub mod customer;
pub mod error;
pub mod extract;
pub mod forms;
pub mod owner;
pub mod session;
pub mod uploads;
pub mod views;

use crate::config::server::ServerConfig;
use axum::{Json, Router, routing::get};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use session::SessionStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Server settings
    pub config: Arc<ServerConfig>,
    /// Open sessions and their carts
    pub sessions: SessionStore,
    /// Auth token signer
    pub tokens: Arc<auth::TokenService>,
}

impl AppState {
    /// Builds the state for a connection and configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: ServerConfig) -> Self {
        let tokens = auth::TokenService::new(&config.jwt_secret, config.token_expiration_minutes);
        Self {
            db,
            config: Arc::new(config),
            sessions: SessionStore::new(),
            tokens: Arc::new(tokens),
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Builds the application router with all routes and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(customer::router())
        .merge(owner::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
