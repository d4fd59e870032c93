/// Database configuration and connection management
pub mod database;

/// Demo account seeding from config.toml
pub mod seed;

/// HTTP server settings from environment variables
pub mod server;
