//! The proxy's module index.
//!
//! Tracks, per module coordinate, the registry serial ID, the `go.mod` text
//! and the version info, and answers "which serial IDs do I have" as a
//! range list for the registry diff.

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod store;

pub use error::{IndexError, IndexResult};
pub use models::{ModuleAddition, RevInfo, Summary};
pub use postgres::PostgresIndex;
pub use repos::ModuleRepo;
pub use store::{Index, SqliteIndex};

use modprox_core::config::DatabaseConfig;
use std::sync::Arc;

/// Create an index from configuration.
pub async fn from_config(config: &DatabaseConfig) -> IndexResult<Arc<dyn Index>> {
    config.validate().map_err(IndexError::Config)?;

    match config {
        DatabaseConfig::Sqlite {
            path,
            query_timeout_secs,
        } => {
            let index = SqliteIndex::new(path, *query_timeout_secs).await?;
            Ok(Arc::new(index) as Arc<dyn Index>)
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
            let index = if let Some(url) = url {
                tracing::info!("Connecting index to PostgreSQL using connection URL");
                PostgresIndex::from_url(url, *max_connections, *statement_timeout_ms).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresIndex::from_params(
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
                return Err(IndexError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(index) as Arc<dyn Index>)
        }
    }
}
