//! The modprox registry.
//!
//! Holds the catalog of module coordinates proxies should mirror, assigns
//! each a serial ID, and tells a proxy which coordinates it is missing given
//! the range-compressed IDs it already has.

pub mod catalog;
pub mod error;
pub mod handlers;
pub mod postgres;
pub mod routes;
pub mod state;
pub mod store;

pub use catalog::Catalog;
pub use error::{ApiError, RegistryError, RegistryResult};
pub use postgres::PostgresCatalog;
pub use routes::create_router;
pub use state::AppState;
pub use store::SqliteCatalog;

use modprox_core::config::DatabaseConfig;
use std::sync::Arc;

/// Create a catalog from configuration.
pub async fn from_config(config: &DatabaseConfig) -> RegistryResult<Arc<dyn Catalog>> {
    config.validate().map_err(RegistryError::Config)?;

    match config {
        DatabaseConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            let catalog = SqliteCatalog::new(path, *query_timeout_secs).await?;
            Ok(Arc::new(catalog) as Arc<dyn Catalog>)
        }
        DatabaseConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let catalog = if let Some(url) = url {
                PostgresCatalog::from_url(url, *max_connections, *statement_timeout_ms).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresCatalog::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    *max_connections,
                    *statement_timeout_ms,
                )
                .await?
            } else {
                return Err(RegistryError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(catalog) as Arc<dyn Catalog>)
        }
    }
}
