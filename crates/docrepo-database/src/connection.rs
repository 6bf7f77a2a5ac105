//! Store connection bootstrapping.

#[cfg(feature = "mongodb")]
use std::time::Duration;

#[cfg(feature = "mongodb")]
use mongodb::bson::doc;
#[cfg(feature = "mongodb")]
use mongodb::options::ClientOptions;
#[cfg(feature = "mongodb")]
use mongodb::{Client, Database};
#[cfg(feature = "mongodb")]
use tracing::info;

#[cfg(feature = "mongodb")]
use docrepo_core::config::DatabaseConfig;
#[cfg(feature = "mongodb")]
use docrepo_core::error::{AppError, ErrorKind};

/// Open a MongoDB client for `config` and verify it with a `ping`.
#[cfg(feature = "mongodb")]
pub async fn connect(config: &DatabaseConfig) -> Result<Database, AppError> {
    let uri = config.connection_uri()?;
    info!(
        url = %mask_password(&uri),
        database = %config.database,
        max_pool_size = config.max_pool_size,
        "Connecting to MongoDB"
    );

    let mut options = ClientOptions::parse(&uri).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Configuration,
            format!("Invalid MongoDB connection string: {e}"),
            e,
        )
    })?;
    options.max_pool_size = Some(config.max_pool_size);
    options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_seconds));
    options.server_selection_timeout = Some(Duration::from_secs(config.connect_timeout_seconds));

    let client = Client::with_options(options).map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to create MongoDB client: {e}"),
            e,
        )
    })?;

    let database = client.database(&config.database);
    database.run_command(doc! { "ping": 1 }).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to connect to database: {e}"),
            e,
        )
    })?;

    info!("Successfully connected to MongoDB");
    Ok(database)
}

/// Mask the password portion of a connection URI for safe logging.
pub fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
