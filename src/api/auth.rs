//! Authentication: bearer tokens and the `/api/auth` routes.
//!
//! A login opens a session (see [`super::session`]) and returns an HS256 token carrying the user
//! id, role and session id. Logging out closes the session, which invalidates the token.

use super::AppState;
use super::error::ApiResult;
use super::extract::CurrentUser;
use crate::core::identity::{self, NewAccount, Role};
use crate::errors::{Error, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Claims of an auth token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// `users.id`, as a string
    pub sub: String,
    /// Role chosen at login
    pub role: Role,
    /// Session id
    pub sid: String,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Signs and verifies auth tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_minutes: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("expiration_minutes", &self.expiration_minutes)
            .finish_non_exhaustive()
    }
}

impl Claims {
    /// The user id carried in `sub`.
    pub fn user_id(&self) -> Result<i64> {
        self.sub.parse().map_err(|_| Error::InvalidToken)
    }
}

impl TokenService {
    /// Creates a service for the given HMAC secret.
    #[must_use]
    pub fn new(secret: &str, expiration_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_minutes,
        }
    }

    /// Expiry of a token issued at `now`.
    #[must_use]
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(self.expiration_minutes)
    }

    /// Issues a token for a user session that expires at `expires_at`.
    pub fn issue(
        &self,
        user_id: i64,
        role: Role,
        sid: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            sid: sid.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            Error::Config {
                message: format!("Failed to sign auth token: {e}"),
            }
        })
    }

    /// Validates signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("Auth token rejected: {e}");
                Error::InvalidToken
            })
    }
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username
    pub username: String,
    /// Plain-text password
    pub password: String,
    /// Role to log in as
    pub role: Role,
}

/// Login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token
    pub token: String,
    /// `users.id`
    pub user_id: i64,
    /// Customer or owner profile id
    pub profile_id: i64,
    /// Login name
    pub username: String,
    /// Role logged in as
    pub role: Role,
}

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Plain-text password
    pub password: String,
    /// Must equal `password`
    pub confirm_password: String,
    /// Account type
    pub role: Role,
    /// Display name
    pub name: String,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Delivery address, customers only
    #[serde(default)]
    pub address: Option<String>,
}

/// Password reset request.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    /// Account email
    pub email: String,
}

/// New password for a reset token.
#[derive(Debug, Deserialize)]
pub struct ResetConfirm {
    /// New password
    pub password: String,
    /// Must equal `password`
    pub confirm_password: String,
}

/// Plain message response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human readable message
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Routes under `/api/auth`.
pub fn router() -> Router<AppState> {
    Router::new().nest("/api/auth", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/reset-password", post(request_reset))
        .route("/reset-password/{token}", post(confirm_reset))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    if req.password != req.confirm_password {
        return Err(Error::validation("Passwords do not match.").into());
    }
    let account = NewAccount {
        username: req.username,
        email: req.email,
        password: req.password,
        name: req.name,
        phone: req.phone,
        address: req.address,
    };
    match req.role {
        Role::Customer => {
            identity::register_customer(&state.db, account).await?;
        }
        Role::Owner => {
            identity::register_owner(&state.db, account).await?;
        }
    }
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Registration successful! Please log in."),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user =
        identity::authenticate(&state.db, req.username.trim(), &req.password, req.role).await?;
    let profile_id = match req.role {
        Role::Customer => identity::customer_profile(&state.db, user.id).await?.id,
        Role::Owner => identity::owner_profile(&state.db, user.id).await?.id,
    };

    let expires_at = state.tokens.expires_at(Utc::now());
    let sid = state.sessions.open(user.id, expires_at);
    let token = state.tokens.issue(user.id, req.role, &sid, expires_at)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        profile_id,
        username: user.username,
        role: req.role,
    }))
}

async fn logout(State(state): State<AppState>, user: CurrentUser) -> StatusCode {
    state.sessions.close(&user.sid);
    info!("User {} logged out", user.user_id);
    StatusCode::NO_CONTENT
}

async fn request_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    identity::request_password_reset(
        &state.db,
        &state.config.jwt_secret,
        &req.email,
        &format!("http://{host}"),
    )
    .await?;
    Ok(MessageResponse::new(
        "If that email is registered, a password reset link has been sent.",
    ))
}

async fn confirm_reset(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetConfirm>,
) -> ApiResult<Json<MessageResponse>> {
    if req.password != req.confirm_password {
        return Err(Error::validation("Passwords do not match.").into());
    }
    identity::reset_password(&state.db, &state.config.jwt_secret, &token, &req.password).await?;
    Ok(MessageResponse::new(
        "Your password has been updated! You can now log in.",
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn issue(service: &TokenService, user_id: i64, role: Role, sid: &str) -> String {
        service
            .issue(user_id, role, sid, service.expires_at(Utc::now()))
            .unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let service = TokenService::new("secret", 5);
        let token = issue(&service, 7, Role::Owner, "sid-1");
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.role, Role::Owner);
        assert_eq!(claims.sid, "sid-1");
    }

    #[test]
    fn test_token_carries_sub_as_string() {
        let service = TokenService::new("secret", 5);
        let token = issue(&service, 42, Role::Customer, "sid");

        // Decode with only the required-claim check, as any other verifier would.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);
        let decoded = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims["sub"], "42");
    }

    #[test]
    fn test_token_rejects_wrong_secret_and_expiry() {
        let token = issue(&TokenService::new("secret", 5), 7, Role::Customer, "sid");
        assert!(matches!(
            TokenService::new("other", 5).verify(&token).unwrap_err(),
            Error::InvalidToken
        ));

        let service = TokenService::new("secret", 5);
        let expired = service
            .issue(7, Role::Customer, "sid", Utc::now() - Duration::minutes(10))
            .unwrap();
        assert!(service.verify(&expired).is_err());
    }

    #[test]
    fn test_non_numeric_sub_is_invalid() {
        let claims = Claims {
            sub: "abc".into(),
            role: Role::Customer,
            sid: "sid".into(),
            iat: 0,
            exp: 0,
        };
        assert!(matches!(claims.user_id().unwrap_err(), Error::InvalidToken));
    }

    #[test]
    fn test_reset_token_is_not_an_auth_token() {
        let reset = identity::generate_reset_token("secret", 7).unwrap();
        assert!(TokenService::new("secret", 5).verify(&reset).is_err());
    }
}
