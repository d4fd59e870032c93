//! Identity business logic - user accounts, credentials and password resets.
//!
//! A user is created together with exactly one profile row (customer or restaurant owner)
//! inside a single database transaction, and deleted together with it and everything it owns.
//! Passwords are hashed with Argon2; password reset tokens are short-lived HS256 JWTs.

use crate::{
    entities::{
        Customer, DishRating, Feedback, Order, OrderItem, Restaurant, RestaurantOwner, User,
        customer, dish_rating, feedback, order, order_item, restaurant, restaurant_owner, user,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ConnectionTrait, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Lifetime of a password reset token.
pub const RESET_TOKEN_TTL_SECONDS: i64 = 3600;

const RESET_TOKEN_PURPOSE: &str = "password-reset";
const MIN_PASSWORD_LENGTH: usize = 6;

/// Role tag stored on every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Browses restaurants and places orders
    Customer,
    /// Manages restaurants and their orders
    Owner,
}

impl Role {
    /// Value stored in `users.role`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "customer" => Ok(Self::Customer),
            "owner" => Ok(Self::Owner),
            other => Err(Error::validation(format!("Unknown role: {other}"))),
        }
    }
}

/// Fields needed to create a user together with its profile.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Login name, unique
    pub username: String,
    /// Contact address, unique
    pub email: String,
    /// Plain-text password
    pub password: String,
    /// Profile display name
    pub name: String,
    /// Profile phone number
    pub phone: Option<String>,
    /// Delivery address (ignored for owners)
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    sub: i64,
    purpose: String,
    iat: i64,
    exp: i64,
}

/// Hashes a password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })?;
    Ok(hash.to_string())
}

/// Checks a password against a stored hash. Malformed hashes never verify.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Finds a user by id.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by login name.
pub async fn get_user_by_username<C>(db: &C, username: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by email address.
pub async fn get_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}

async fn validate_account<C>(db: &C, account: &NewAccount) -> Result<()>
where
    C: ConnectionTrait,
{
    if account.username.trim().is_empty() {
        return Err(Error::validation("Username cannot be empty"));
    }
    if !account.email.contains('@') {
        return Err(Error::validation("Email address is not valid"));
    }
    if account.name.trim().is_empty() {
        return Err(Error::validation("Name cannot be empty"));
    }
    validate_password(&account.password)?;

    if get_user_by_username(db, account.username.trim())
        .await?
        .is_some()
    {
        return Err(Error::validation("Username is already taken"));
    }
    if get_user_by_email(db, account.email.trim()).await?.is_some() {
        return Err(Error::validation("Email is already registered"));
    }
    Ok(())
}

async fn insert_user<C>(db: &C, account: &NewAccount, role: Role) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let user = user::ActiveModel {
        username: Set(account.username.trim().to_string()),
        email: Set(account.email.trim().to_string()),
        password_hash: Set(hash_password(&account.password)?),
        role: Set(role.as_str().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    user.insert(db).await.map_err(Into::into)
}

/// Creates a customer account and its profile in one transaction.
///
/// # Errors
/// Returns a validation error when a field is empty, the password is too short,
/// or the username or email is already in use.
pub async fn register_customer(
    db: &DatabaseConnection,
    account: NewAccount,
) -> Result<(user::Model, customer::Model)> {
    let txn = db.begin().await?;
    validate_account(&txn, &account).await?;

    let user = insert_user(&txn, &account, Role::Customer).await?;
    let now = Utc::now();
    let profile = customer::ActiveModel {
        user_id: Set(user.id),
        name: Set(account.name.trim().to_string()),
        address: Set(account.address),
        phone: Set(account.phone),
        preferences: Set(None),
        dietary_restrictions: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!("Registered customer '{}'", user.username);
    Ok((user, profile))
}

/// Creates a restaurant owner account and its profile in one transaction.
///
/// # Errors
/// Same validation rules as [`register_customer`].
pub async fn register_owner(
    db: &DatabaseConnection,
    account: NewAccount,
) -> Result<(user::Model, restaurant_owner::Model)> {
    let txn = db.begin().await?;
    validate_account(&txn, &account).await?;

    let user = insert_user(&txn, &account, Role::Owner).await?;
    let now = Utc::now();
    let profile = restaurant_owner::ActiveModel {
        user_id: Set(user.id),
        name: Set(account.name.trim().to_string()),
        phone: Set(account.phone),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!("Registered restaurant owner '{}'", user.username);
    Ok((user, profile))
}

/// Verifies username, password and role together.
///
/// Any mismatch yields [`Error::InvalidCredentials`] without revealing which
/// part was wrong.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    role: Role,
) -> Result<user::Model> {
    let user = get_user_by_username(db, username).await?;

    match user {
        Some(user)
            if user.role == role.as_str() && verify_password(password, &user.password_hash) =>
        {
            info!("User {} logged in successfully", user.username);
            Ok(user)
        }
        _ => {
            warn!("Failed login attempt for username: {username}");
            Err(Error::InvalidCredentials)
        }
    }
}

/// Customer profile of a user.
pub async fn customer_profile<C>(db: &C, user_id: i64) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    Customer::find()
        .filter(customer::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::CustomerNotFound { id: user_id })
}

/// Restaurant owner profile of a user.
pub async fn owner_profile<C>(db: &C, user_id: i64) -> Result<restaurant_owner::Model>
where
    C: ConnectionTrait,
{
    RestaurantOwner::find()
        .filter(restaurant_owner::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::OwnerNotFound { id: user_id })
}

/// Updates username and email of an account, keeping both unique.
pub async fn update_account<C>(
    db: &C,
    user_id: i64,
    username: &str,
    email: &str,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() {
        return Err(Error::validation("Username cannot be empty"));
    }
    if !email.contains('@') {
        return Err(Error::validation("Email address is not valid"));
    }

    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            name: user_id.to_string(),
        })?;

    if let Some(other) = get_user_by_username(db, username).await?
        && other.id != user_id
    {
        return Err(Error::validation("Username is already taken"));
    }
    if let Some(other) = get_user_by_email(db, email).await?
        && other.id != user_id
    {
        return Err(Error::validation("Email is already registered"));
    }

    let mut active: user::ActiveModel = user.into();
    active.username = Set(username.to_string());
    active.email = Set(email.to_string());
    active.update(db).await.map_err(Into::into)
}

/// Deletes a user, its profile and everything the profile owns.
///
/// Returns the image file names that belonged to deleted restaurants and menu
/// items so the caller can remove them from disk.
pub async fn delete_user(db: &DatabaseConnection, user_id: i64) -> Result<Vec<String>> {
    let txn = db.begin().await?;

    let user = get_user_by_id(&txn, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            name: user_id.to_string(),
        })?;

    let mut orphaned_images = Vec::new();

    if let Some(profile) = Customer::find()
        .filter(customer::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
    {
        let order_ids: Vec<i64> = Order::find()
            .filter(order::Column::CustomerId.eq(profile.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|o| o.id)
            .collect();

        DishRating::delete_many()
            .filter(dish_rating::Column::OrderId.is_in(order_ids.clone()))
            .exec(&txn)
            .await?;
        Feedback::delete_many()
            .filter(feedback::Column::OrderId.is_in(order_ids.clone()))
            .exec(&txn)
            .await?;
        OrderItem::delete_many()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .exec(&txn)
            .await?;
        Order::delete_many()
            .filter(order::Column::CustomerId.eq(profile.id))
            .exec(&txn)
            .await?;
        Customer::delete_by_id(profile.id).exec(&txn).await?;
    }

    if let Some(profile) = RestaurantOwner::find()
        .filter(restaurant_owner::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
    {
        let restaurants = Restaurant::find()
            .filter(restaurant::Column::OwnerId.eq(profile.id))
            .all(&txn)
            .await?;
        for r in restaurants {
            orphaned_images
                .extend(crate::core::restaurant::delete_restaurant_rows(&txn, r.id).await?);
        }
        RestaurantOwner::delete_by_id(profile.id).exec(&txn).await?;
    }

    User::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted user '{}' and all owned records", user.username);
    Ok(orphaned_images)
}

/// Creates a signed password reset token for a user.
pub fn generate_reset_token(secret: &str, user_id: i64) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = ResetClaims {
        sub: user_id,
        purpose: RESET_TOKEN_PURPOSE.to_string(),
        iat: now,
        exp: now + RESET_TOKEN_TTL_SECONDS,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Config {
        message: format!("Failed to sign reset token: {e}"),
    })
}

/// Returns the user id carried by a valid, unexpired reset token.
#[must_use]
pub fn verify_reset_token(secret: &str, token: &str) -> Option<i64> {
    let decoded = jsonwebtoken::decode::<ResetClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    );

    match decoded {
        Ok(data) if data.claims.purpose == RESET_TOKEN_PURPOSE => Some(data.claims.sub),
        Ok(_) => {
            warn!("Token verification failed: wrong purpose");
            None
        }
        Err(e) => {
            warn!("Token verification failed: {e}");
            None
        }
    }
}

/// Starts a password reset for the account registered under `email`.
///
/// The reset link is logged instead of mailed. Unknown addresses are ignored so
/// the response does not reveal which emails exist; the token is returned only
/// for callers that need it (tests, admin tooling).
pub async fn request_password_reset(
    db: &DatabaseConnection,
    secret: &str,
    email: &str,
    base_url: &str,
) -> Result<Option<String>> {
    let Some(user) = get_user_by_email(db, email.trim()).await? else {
        info!("Password reset requested for unknown email");
        return Ok(None);
    };

    let token = generate_reset_token(secret, user.id)?;
    info!(
        "[SIMULATED EMAIL] Password reset link for {}: {}/api/auth/reset-password/{}",
        user.email,
        base_url.trim_end_matches('/'),
        token
    );
    Ok(Some(token))
}

/// Sets a new password for the user named by a valid reset token.
pub async fn reset_password(
    db: &DatabaseConnection,
    secret: &str,
    token: &str,
    new_password: &str,
) -> Result<user::Model> {
    let user_id = verify_reset_token(secret, token).ok_or(Error::InvalidToken)?;
    validate_password(new_password)?;

    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or(Error::InvalidToken)?;

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_password(new_password)?);
    let updated = active.update(db).await?;

    info!("Password reset completed for user: {}", updated.username);
    Ok(updated)
}
