//! Module repository.

use crate::error::IndexResult;
use crate::models::{ModuleAddition, RevInfo, Summary};
use async_trait::async_trait;
use modprox_core::{ModuleCoordinate, RangeIds, SerialCoordinate, SerialId};

/// Repository for indexed module versions.
#[async_trait]
pub trait ModuleRepo: Send + Sync {
    /// Record a module's manifest, version info and serial ID in one write.
    /// Re-indexing an existing coordinate replaces the manifest and serial ID
    /// but keeps the original version time.
    async fn put(&self, addition: &ModuleAddition) -> IndexResult<()>;

    /// The serial ID of `coordinate`, or `None` if it is not indexed.
    async fn contains(&self, coordinate: &ModuleCoordinate) -> IndexResult<Option<SerialId>>;

    /// Overwrite only the serial ID of an already-indexed coordinate.
    async fn update_id(&self, serial: &SerialCoordinate) -> IndexResult<()>;

    /// The `go.mod` text of an indexed coordinate.
    async fn mod_file(&self, coordinate: &ModuleCoordinate) -> IndexResult<String>;

    /// The version info of an indexed coordinate.
    async fn info(&self, coordinate: &ModuleCoordinate) -> IndexResult<RevInfo>;

    /// Every version indexed under exactly `source`, ascending by semver.
    async fn versions(&self, source: &str) -> IndexResult<Vec<String>>;

    /// Forget a coordinate. Removing an absent coordinate succeeds.
    async fn remove(&self, coordinate: &ModuleCoordinate) -> IndexResult<()>;

    /// All serial IDs held, range compressed. Computed on every call.
    async fn ids(&self) -> IndexResult<RangeIds>;

    async fn summary(&self) -> IndexResult<Summary>;
}
