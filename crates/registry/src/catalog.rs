//! The registry catalog: every known module coordinate and its serial ID.

use crate::error::RegistryResult;
use async_trait::async_trait;
use modprox_core::{ModuleCoordinate, RangeIds, SerialCoordinate, SerialId};
use sqlx::FromRow;

/// Store of registered module coordinates.
///
/// Serial IDs are assigned on first registration, increase monotonically and
/// are never reused. Re-registering a known coordinate changes nothing.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn migrate(&self) -> RegistryResult<()>;

    async fn health_check(&self) -> RegistryResult<()>;

    /// Register coordinates, returning how many were new.
    async fn register(&self, modules: &[ModuleCoordinate]) -> RegistryResult<usize>;

    /// Every registered coordinate, ascending by serial ID.
    async fn all(&self) -> RegistryResult<Vec<SerialCoordinate>>;

    /// Registered coordinates whose serial ID is not covered by `held`,
    /// ascending by serial ID.
    async fn missing(&self, held: &RangeIds) -> RegistryResult<Vec<SerialCoordinate>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|s| !held.contains(s.serial_id))
            .collect())
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct SerialRow {
    pub id: SerialId,
    pub source: String,
    pub version: String,
}

impl From<SerialRow> for SerialCoordinate {
    fn from(row: SerialRow) -> Self {
        SerialCoordinate::new(
            ModuleCoordinate {
                source: row.source,
                version: row.version,
            },
            row.id,
        )
    }
}
