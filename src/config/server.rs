//! HTTP server settings read from environment variables.
//!
//! Values usually come from `.env`, loaded by `dotenvy` in `main` before this
//! module is consulted.

use crate::errors::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_TOKEN_EXPIRATION_MINUTES: i64 = 1440;
const DEV_SECRET: &str = "menu-buddy-dev-secret-change-me-in-production";

/// Runtime settings for the API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: SocketAddr,
    /// Directory uploaded images are written to
    pub upload_dir: PathBuf,
    /// HMAC secret for auth and password-reset tokens
    pub jwt_secret: String,
    /// Lifetime of auth tokens
    pub token_expiration_minutes: i64,
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `UPLOAD_DIR`, `JWT_SECRET` and
    /// `TOKEN_EXPIRATION_MINUTES`, falling back to development defaults.
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| Error::Config {
                message: format!("Invalid BIND_ADDR: {e}"),
            })?;

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR), PathBuf::from);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using an insecure development secret");
            DEV_SECRET.to_string()
        });

        let token_expiration_minutes = match std::env::var("TOKEN_EXPIRATION_MINUTES") {
            Ok(raw) => raw.parse().map_err(|e| Error::Config {
                message: format!("Invalid TOKEN_EXPIRATION_MINUTES: {e}"),
            })?,
            Err(_) => DEFAULT_TOKEN_EXPIRATION_MINUTES,
        };

        Ok(Self {
            bind_addr,
            upload_dir,
            jwt_secret,
            token_expiration_minutes,
        })
    }

    /// Settings for tests: ephemeral port, given upload directory, fixed secret.
    #[must_use]
    pub fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            upload_dir,
            jwt_secret: DEV_SECRET.to_string(),
            token_expiration_minutes: 60,
        }
    }
}
