//! SQLite catalog implementation.

use crate::catalog::{Catalog, SerialRow};
use crate::error::RegistryResult;
use async_trait::async_trait;
use modprox_core::{ModuleCoordinate, SerialCoordinate};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// SQLite-backed catalog.
pub struct SqliteCatalog {
    pool: Pool<Sqlite>,
}

impl SqliteCatalog {
    /// Open (or create) the catalog at `path`.
    pub async fn new(path: impl AsRef<Path>, query_timeout_secs: Option<u64>) -> RegistryResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(query_timeout_secs.unwrap_or(60)))
            .connect_with(opts)
            .await?;

        let catalog = Self { pool };
        catalog.migrate().await?;
        Ok(catalog)
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn migrate(&self) -> RegistryResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> RegistryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn register(&self, modules: &[ModuleCoordinate]) -> RegistryResult<usize> {
        let unique: BTreeSet<&ModuleCoordinate> = modules.iter().collect();
        let now = OffsetDateTime::now_utc();

        let mut tx = self.pool.begin().await?;
        let mut added = 0;
        for module in unique {
            let result = sqlx::query(
                "INSERT INTO serials (source, version, registered_at) VALUES (?, ?, ?)
                 ON CONFLICT(source, version) DO NOTHING",
            )
            .bind(&module.source)
            .bind(&module.version)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            added += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(added)
    }

    async fn all(&self) -> RegistryResult<Vec<SerialCoordinate>> {
        let rows: Vec<SerialRow> =
            sqlx::query_as("SELECT id, source, version FROM serials ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(SerialCoordinate::from).collect())
    }
}

// AUTOINCREMENT keeps IDs of deleted rows from being handed out again.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS serials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    version TEXT NOT NULL,
    registered_at TEXT NOT NULL,
    UNIQUE (source, version)
);
"#;
