//! PostgreSQL catalog implementation.

use crate::catalog::{Catalog, SerialRow};
use crate::error::RegistryResult;
use async_trait::async_trait;
use modprox_core::config::PgSslMode;
use modprox_core::{ModuleCoordinate, SerialCoordinate};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::collections::BTreeSet;
use std::str::FromStr;
use time::OffsetDateTime;

const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

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

/// PostgreSQL-backed catalog.
pub struct PostgresCatalog {
    pool: Pool<Postgres>,
}

impl PostgresCatalog {
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> RegistryResult<Self> {
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
    ) -> RegistryResult<Self> {
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
        tracing::info!(host = host, port = port, database = database, "Connecting catalog to PostgreSQL");
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> RegistryResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let catalog = Self { pool };
        catalog.migrate().await?;
        Ok(catalog)
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn migrate(&self) -> RegistryResult<()> {
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
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
                "INSERT INTO serials (source, version, registered_at) VALUES ($1, $2, $3)
                 ON CONFLICT (source, version) DO NOTHING",
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements() {
        let statements = postgres_schema_statements(POSTGRES_SCHEMA);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("BIGSERIAL"));
    }
}
