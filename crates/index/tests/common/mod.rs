//! Index test utilities.

use modprox_core::ModuleCoordinate;
use modprox_index::{Index, IndexResult, ModuleAddition, PostgresIndex, SqliteIndex};
use std::sync::Arc;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// Stable prefix for Docker/container startup failures in Postgres test setup.
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "postgres-container-start:";

/// A SQLite index living in a temp directory that is removed on drop.
#[allow(dead_code)]
pub struct TestIndex {
    pub index: Arc<dyn Index>,
    _temp_dir: TempDir,
}

impl TestIndex {
    pub async fn new() -> IndexResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let index = SqliteIndex::new(temp_dir.path().join("index.db"), None).await?;
        Ok(Self {
            index: Arc::new(index),
            _temp_dir: temp_dir,
        })
    }

    pub fn index(&self) -> Arc<dyn Index> {
        self.index.clone()
    }
}

/// PostgreSQL index backed by a testcontainer.
#[allow(dead_code)]
pub struct PostgresTestIndex {
    pub index: Arc<dyn Index>,
    _container: ContainerAsync<Postgres>,
}

impl PostgresTestIndex {
    pub async fn new() -> IndexResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                modprox_index::IndexError::Io(std::io::Error::other(format!(
                    "{POSTGRES_CONTAINER_START_ERR_PREFIX} Failed to start PostgreSQL container: {e}"
                )))
            })?;

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");
        let index = PostgresIndex::from_url(&url, 5, None).await?;

        Ok(Self {
            index: Arc::new(index),
            _container: container,
        })
    }

    pub fn index(&self) -> Arc<dyn Index> {
        self.index.clone()
    }
}

/// Run a test against both SQLite and PostgreSQL backends.
#[allow(dead_code)]
pub async fn run_index_test_both<F, Fut>(test_fn: F)
where
    F: Fn(Arc<dyn Index>) -> Fut + Clone,
    Fut: std::future::Future<Output = ()>,
{
    let sqlite = TestIndex::new()
        .await
        .expect("Failed to create SQLite test index");
    test_fn.clone()(sqlite.index()).await;

    if std::env::var("SKIP_POSTGRES_TESTS").is_err() {
        match PostgresTestIndex::new().await {
            Ok(postgres) => test_fn(postgres.index()).await,
            Err(err) => eprintln!("Skipping PostgreSQL index tests: {err}"),
        }
    }
}

#[allow(dead_code)]
pub fn coordinate(source: &str, version: &str) -> ModuleCoordinate {
    ModuleCoordinate::new(source, version).expect("valid coordinate")
}

#[allow(dead_code)]
pub fn addition(source: &str, version: &str, serial_id: i64) -> ModuleAddition {
    ModuleAddition {
        coordinate: coordinate(source, version),
        serial_id,
        mod_file: format!("module {source}\n"),
    }
}
