//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// A flat key/value object store.
///
/// Keys are `/`-separated relative paths. Writes replace existing objects
/// atomically.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Read a whole object. Missing keys yield [`StorageError::NotFound`].
    ///
    /// [`StorageError::NotFound`]: crate::StorageError::NotFound
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    fn backend_name(&self) -> &'static str;

    /// Check that the backend is reachable and usable.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
