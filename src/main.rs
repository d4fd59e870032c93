use dotenvy::dotenv;
use menu_buddy::{
    api::{self, AppState},
    config::{database, seed, server::ServerConfig},
    errors::Result,
};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load server settings
    let server_config = ServerConfig::from_env()
        .inspect_err(|e| error!("Critical error loading server configuration: {}", e))?;

    // 4. Make sure the data and upload directories exist
    let database_url = database::get_database_url();
    if let Some(dir) = database_url
        .strip_prefix("sqlite://")
        .and_then(|rest| rest.split('?').next())
        .and_then(|file| Path::new(file).parent())
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(&server_config.upload_dir).await?;

    // 5. Initialize database
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 6. Seed demo accounts from config.toml
    let seed_config = seed::load_default_config()?;
    let created = seed::seed_users(&db, &seed_config)
        .await
        .inspect_err(|e| error!("Failed to seed users: {}", e))?;
    info!("Seeded {} demo account(s).", created);

    // 7. Serve the API
    let bind_addr = server_config.bind_addr;
    let app = api::router(AppState::new(db, server_config));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
