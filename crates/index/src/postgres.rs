//! PostgreSQL index implementation.

use crate::error::{IndexError, IndexResult};
use crate::models::{ModuleAddition, ModuleRow, RevInfo, Summary};
use crate::repos::ModuleRepo;
use crate::store::Index;
use async_trait::async_trait;
use modprox_core::config::PgSslMode;
use modprox_core::version::sort_versions;
use modprox_core::{ModuleCoordinate, RangeIds, SerialCoordinate, SerialId};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;

const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

/// Split the schema into statements; the extended protocol runs one at a time.
fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .map(str::trim)
        .filter(|statement| {
            statement
                .lines()
                .any(|line| !line.trim().is_empty() && !line.trim().starts_with("--"))
        })
        .collect()
}

/// PostgreSQL-backed index.
pub struct PostgresIndex {
    pool: Pool<Postgres>,
}

impl PostgresIndex {
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> IndexResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> IndexResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);
        if let Some(user) = username {
            opts = opts.username(user);
        }
        if let Some(pass) = password {
            opts = opts.password(pass);
        }
        if let Some(mode) = ssl_mode {
            opts = opts.ssl_mode(match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            });
        }

        tracing::info!(
            host = host,
            port = port,
            database = database,
            ssl_mode = ?ssl_mode,
            "Connecting index to PostgreSQL"
        );
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> IndexResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let index = Self { pool };
        index.migrate().await?;
        Ok(index)
    }

    async fn row(&self, coordinate: &ModuleCoordinate) -> IndexResult<ModuleRow> {
        sqlx::query_as::<_, ModuleRow>(
            "SELECT source, version, serial_id, go_mod, indexed_at FROM modules WHERE source = $1 AND version = $2",
        )
        .bind(&coordinate.source)
        .bind(&coordinate.version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| IndexError::NotIndexed(coordinate.to_string()))
    }
}

#[async_trait]
impl Index for PostgresIndex {
    async fn migrate(&self) -> IndexResult<()> {
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> IndexResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ModuleRepo for PostgresIndex {
    async fn put(&self, addition: &ModuleAddition) -> IndexResult<()> {
        sqlx::query(
            r#"
            INSERT INTO modules (source, version, serial_id, go_mod, indexed_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(source, version) DO UPDATE SET
                serial_id = EXCLUDED.serial_id,
                go_mod = EXCLUDED.go_mod
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
        let id =
            sqlx::query_scalar("SELECT serial_id FROM modules WHERE source = $1 AND version = $2")
                .bind(&coordinate.source)
                .bind(&coordinate.version)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }

    async fn update_id(&self, serial: &SerialCoordinate) -> IndexResult<()> {
        let result =
            sqlx::query("UPDATE modules SET serial_id = $1 WHERE source = $2 AND version = $3")
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
        let mut versions: Vec<String> = sqlx::query_scalar(
            "SELECT version FROM modules WHERE source = $1 ORDER BY seq",
        )
        .bind(source)
        .fetch_all(&self.pool)
        .await?;
        sort_versions(&mut versions);
        Ok(versions)
    }

    async fn remove(&self, coordinate: &ModuleCoordinate) -> IndexResult<()> {
        sqlx::query("DELETE FROM modules WHERE source = $1 AND version = $2")
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
