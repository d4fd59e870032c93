//! Demo account configuration loading from config.toml
//!
//! The accounts listed in config.toml are created on startup when no user with
//! the same username exists yet, so seeding can run on every boot.

use crate::core::identity::{self, NewAccount, Role};
use crate::errors::{Error, Result};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Demo accounts to seed
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

/// One account to create on startup
#[derive(Debug, Deserialize, Clone)]
pub struct SeedUser {
    /// Login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Plain-text password, hashed before storage
    pub password: String,
    /// `"customer"` or `"owner"`
    pub role: Role,
    /// Display name for the profile
    pub name: String,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Delivery address, customers only
    #[serde(default)]
    pub address: Option<String>,
}

impl From<SeedUser> for NewAccount {
    fn from(user: SeedUser) -> Self {
        Self {
            username: user.username,
            email: user.email,
            password: user.password,
            name: user.name,
            phone: user.phone,
            address: user.address,
        }
    }
}

/// Loads seeding configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads seeding configuration from `./config.toml`, or an empty one when the
/// file does not exist.
pub fn load_default_config() -> Result<Config> {
    let path = Path::new("config.toml");
    if !path.exists() {
        info!("No config.toml found, skipping user seeding");
        return Ok(Config { users: Vec::new() });
    }
    load_config(path)
}

/// Creates every configured account whose username is not taken yet.
///
/// Returns the number of accounts created.
pub async fn seed_users(db: &DatabaseConnection, config: &Config) -> Result<usize> {
    let mut created = 0;
    for user in &config.users {
        if identity::get_user_by_username(db, &user.username)
            .await?
            .is_some()
        {
            continue;
        }

        let role = user.role;
        let account = NewAccount::from(user.clone());
        match role {
            Role::Customer => {
                identity::register_customer(db, account).await?;
            }
            Role::Owner => {
                identity::register_owner(db, account).await?;
            }
        }
        info!("Seeded {} account '{}'", role, user.username);
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    const SAMPLE: &str = r#"
        [[users]]
        username = "customer1"
        email = "customer1@example.com"
        password = "password123"
        role = "customer"
        name = "Rahul Sharma"
        address = "123 Connaught Place, New Delhi"
        phone = "9876543210"

        [[users]]
        username = "owner1"
        email = "owner1@example.com"
        password = "password123"
        role = "owner"
        name = "Priya Patel"
    "#;

    #[test]
    fn test_parse_seed_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users[0].username, "customer1");
        assert_eq!(config.users[0].role, Role::Customer);
        assert_eq!(config.users[1].role, Role::Owner);
        assert!(config.users[1].address.is_none());
    }

    #[test]
    fn test_parse_rejects_unknown_role() {
        let bad = r#"
            [[users]]
            username = "x"
            email = "x@example.com"
            password = "p"
            role = "admin"
            name = "X"
        "#;
        assert!(toml::from_str::<Config>(bad).is_err());
    }

    #[tokio::test]
    async fn test_seed_users_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let config: Config = toml::from_str(SAMPLE).unwrap();

        assert_eq!(seed_users(&db, &config).await?, 2);
        assert_eq!(seed_users(&db, &config).await?, 0);

        let owner = identity::get_user_by_username(&db, "owner1").await?.unwrap();
        assert_eq!(owner.role, "owner");
        assert!(identity::owner_profile(&db, owner.id).await.is_ok());

        Ok(())
    }
}
