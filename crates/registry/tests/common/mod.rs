//! Catalog test utilities.

use modprox_core::ModuleCoordinate;
use modprox_registry::{Catalog, PostgresCatalog, RegistryError, RegistryResult, SqliteCatalog};
use std::sync::Arc;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// Stable prefix for Docker/container startup failures in Postgres test setup.
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "postgres-container-start:";

/// A SQLite catalog living in a temp directory that is removed on drop.
#[allow(dead_code)]
pub struct TestCatalog {
    pub catalog: Arc<dyn Catalog>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestCatalog {
    pub async fn new() -> RegistryResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let catalog = SqliteCatalog::new(temp_dir.path().join("registry.db"), None).await?;
        Ok(Self {
            catalog: Arc::new(catalog),
            _temp_dir: temp_dir,
        })
    }

    pub fn catalog(&self) -> Arc<dyn Catalog> {
        self.catalog.clone()
    }
}

/// PostgreSQL catalog backed by a testcontainer.
#[allow(dead_code)]
pub struct PostgresTestCatalog {
    pub catalog: Arc<dyn Catalog>,
    _container: ContainerAsync<Postgres>,
}

impl PostgresTestCatalog {
    pub async fn new() -> RegistryResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                RegistryError::Io(std::io::Error::other(format!(
                    "{POSTGRES_CONTAINER_START_ERR_PREFIX} Failed to start PostgreSQL container: {e}"
                )))
            })?;

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");
        let catalog = PostgresCatalog::from_url(&url, 5, None).await?;

        Ok(Self {
            catalog: Arc::new(catalog),
            _container: container,
        })
    }

    pub fn catalog(&self) -> Arc<dyn Catalog> {
        self.catalog.clone()
    }
}

/// Run a test against both SQLite and PostgreSQL backends.
#[allow(dead_code)]
pub async fn run_catalog_test_both<F, Fut>(test_fn: F)
where
    F: Fn(Arc<dyn Catalog>) -> Fut + Clone,
    Fut: std::future::Future<Output = ()>,
{
    let sqlite = TestCatalog::new()
        .await
        .expect("Failed to create SQLite test catalog");
    test_fn.clone()(sqlite.catalog()).await;

    if std::env::var("SKIP_POSTGRES_TESTS").is_err() {
        match PostgresTestCatalog::new().await {
            Ok(postgres) => test_fn(postgres.catalog()).await,
            Err(err) => eprintln!("Skipping PostgreSQL catalog tests: {err}"),
        }
    }
}

#[allow(dead_code)]
pub fn coordinate(source: &str, version: &str) -> ModuleCoordinate {
    ModuleCoordinate::new(source, version).expect("valid coordinate")
}
