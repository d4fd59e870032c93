//! Request extractors for authenticated callers.
//!
//! [`CurrentUser`] validates the bearer token and its session. [`CustomerUser`] and
//! [`OwnerUser`] additionally require the matching role and resolve the profile id.

use super::AppState;
use super::error::AppError;
use crate::core::identity::{self, Role};
use crate::errors::Error;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::warn;

/// Any logged-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// `users.id`
    pub user_id: i64,
    /// Role chosen at login
    pub role: Role,
    /// Session id holding the cart
    pub sid: String,
}

/// A logged-in customer.
#[derive(Debug, Clone)]
pub struct CustomerUser {
    /// `users.id`
    pub user_id: i64,
    /// `customers.id`
    pub customer_id: i64,
    /// Session id holding the cart
    pub sid: String,
}

/// A logged-in restaurant owner.
#[derive(Debug, Clone)]
pub struct OwnerUser {
    /// `users.id`
    pub user_id: i64,
    /// `restaurant_owners.id`
    pub owner_id: i64,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<Self>() {
            return Ok(user.clone());
        }

        let Some(token) = bearer_token(parts) else {
            warn!(uri = %parts.uri, "Missing bearer token");
            return Err(Error::InvalidToken.into());
        };
        let claims = state.tokens.verify(token)?;
        if !state.sessions.contains(&claims.sid) {
            warn!(uri = %parts.uri, "Token for a closed session");
            return Err(Error::InvalidToken.into());
        }

        let user = Self {
            user_id: claims.user_id()?,
            role: claims.role,
            sid: claims.sid,
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

impl FromRequestParts<AppState> for CustomerUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Customer {
            return Err(
                Error::forbidden(format!("user {} is not a customer", user.user_id)).into(),
            );
        }
        let profile = identity::customer_profile(&state.db, user.user_id).await?;
        Ok(Self {
            user_id: user.user_id,
            customer_id: profile.id,
            sid: user.sid,
        })
    }
}

impl FromRequestParts<AppState> for OwnerUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Owner {
            return Err(
                Error::forbidden(format!("user {} is not an owner", user.user_id)).into(),
            );
        }
        let profile = identity::owner_profile(&state.db, user.user_id).await?;
        Ok(Self {
            user_id: user.user_id,
            owner_id: profile.id,
        })
    }
}
