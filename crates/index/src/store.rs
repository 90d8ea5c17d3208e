//! Index trait and the SQLite implementation.

use crate::error::{IndexError, IndexResult};
use crate::models::{ModuleAddition, ModuleRow, RevInfo, Summary};
use crate::repos::ModuleRepo;
use async_trait::async_trait;
use modprox_core::version::sort_versions;
use modprox_core::{ModuleCoordinate, RangeIds, SerialCoordinate, SerialId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Combined index trait.
#[async_trait]
pub trait Index: ModuleRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> IndexResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> IndexResult<()>;
}

/// SQLite-backed index.
pub struct SqliteIndex {
    pool: Pool<Sqlite>,
}

impl SqliteIndex {
    /// Open (or create) the index at `path`.
    pub async fn new(path: impl AsRef<Path>, query_timeout_secs: Option<u64>) -> IndexResult<Self> {
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
            // one writer at a time; avoids "database is locked" under concurrent handlers
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(query_timeout_secs.unwrap_or(60)))
            .connect_with(opts)
            .await?;

        let index = Self { pool };
        index.migrate().await?;
        Ok(index)
    }

    /// Get a reference to the connection pool.

    async fn row(&self, coordinate: &ModuleCoordinate) -> IndexResult<ModuleRow> {
        sqlx::query_as::<_, ModuleRow>(
            "SELECT source, version, serial_id, go_mod, indexed_at FROM modules WHERE source = ? AND version = ?",
        )
        .bind(&coordinate.source)
        .bind(&coordinate.version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| IndexError::NotIndexed(coordinate.to_string()))
    }
}

#[async_trait]
impl Index for SqliteIndex {
    async fn migrate(&self) -> IndexResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> IndexResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ModuleRepo for SqliteIndex {
    async fn put(&self, addition: &ModuleAddition) -> IndexResult<()> {
        // Single-row upsert: serial ID and manifest are never visible apart.
        sqlx::query(
            r#"
            INSERT INTO modules (source, version, serial_id, go_mod, indexed_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(source, version) DO UPDATE SET
                serial_id = excluded.serial_id,
                go_mod = excluded.go_mod
            "#,
        )
        .bind(&addition.coordinate.source)
        .bind(&addition.coordinate.version)
        .bind(addition.serial_id)
        .bind(&addition.mod_file)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn contains(&self, coordinate: &ModuleCoordinate) -> IndexResult<Option<SerialId>> {
        let id = sqlx::query_scalar("SELECT serial_id FROM modules WHERE source = ? AND version = ?")
            .bind(&coordinate.source)
            .bind(&coordinate.version)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn update_id(&self, serial: &SerialCoordinate) -> IndexResult<()> {
        let result =
            sqlx::query("UPDATE modules SET serial_id = ? WHERE source = ? AND version = ?")
                .bind(serial.serial_id)
                .bind(&serial.module.source)
                .bind(&serial.module.version)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(IndexError::NotIndexed(serial.module.to_string()));
        }
        Ok(())
    }

    async fn mod_file(&self, coordinate: &ModuleCoordinate) -> IndexResult<String> {
        Ok(self.row(coordinate).await?.go_mod)
    }

    async fn info(&self, coordinate: &ModuleCoordinate) -> IndexResult<RevInfo> {
        Ok(self.row(coordinate).await?.info())
    }

    async fn versions(&self, source: &str) -> IndexResult<Vec<String>> {
        let mut versions: Vec<String> =
            sqlx::query_scalar("SELECT version FROM modules WHERE source = ? ORDER BY seq")
                .bind(source)
                .fetch_all(&self.pool)
                .await?;
        sort_versions(&mut versions);
        Ok(versions)
    }

    async fn remove(&self, coordinate: &ModuleCoordinate) -> IndexResult<()> {
        sqlx::query("DELETE FROM modules WHERE source = ? AND version = ?")
            .bind(&coordinate.source)
            .bind(&coordinate.version)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ids(&self) -> IndexResult<RangeIds> {
        let ids: Vec<SerialId> = sqlx::query_scalar("SELECT serial_id FROM modules")
            .fetch_all(&self.pool)
            .await?;
        Ok(RangeIds::compress(ids))
    }

    async fn summary(&self) -> IndexResult<Summary> {
        let (sources, versions): (i64, i64) =
            sqlx::query_as("SELECT COUNT(DISTINCT source), COUNT(*) FROM modules")
                .fetch_one(&self.pool)
                .await?;
        Ok(Summary { sources, versions })
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS modules (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    version TEXT NOT NULL,
    serial_id INTEGER NOT NULL,
    go_mod TEXT NOT NULL,
    indexed_at TEXT NOT NULL,
    UNIQUE (source, version)
);
CREATE INDEX IF NOT EXISTS idx_modules_serial_id ON modules(serial_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_index_creates_parent_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("index.db");
        let index = SqliteIndex::new(&path, None).await.unwrap();
        index.health_check().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_migrate_is_repeatable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let index = SqliteIndex::new(temp_dir.path().join("index.db"), None)
            .await
            .unwrap();
        index.migrate().await.unwrap();
        index.migrate().await.unwrap();
    }
}
