//! Module archive storage keyed by coordinate.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use async_trait::async_trait;
use modprox_core::escape::escape;
use modprox_core::{Blob, ModuleCoordinate};
use std::sync::Arc;
use tracing::debug;

/// Persistent home of normalized module archives.
#[async_trait]
pub trait ZipStore: Send + Sync {
    /// Store (or replace) the archive for `coordinate`.
    async fn put_zip(&self, coordinate: &ModuleCoordinate, blob: Blob) -> StorageResult<()>;

    /// Fetch the archive for `coordinate`.
    async fn get_zip(&self, coordinate: &ModuleCoordinate) -> StorageResult<Blob>;

    /// Delete the archive for `coordinate`. Deleting an absent archive succeeds.
    async fn del_zip(&self, coordinate: &ModuleCoordinate) -> StorageResult<()>;
}

/// [`ZipStore`] on top of any [`ObjectStore`].
///
/// Objects live at `{escaped source}/@v/{escaped version}.zip`, the same
/// shape as the protocol URL.
pub struct ObjectZipStore {
    store: Arc<dyn ObjectStore>,
}

impl ObjectZipStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

/// Storage key for a module archive.
pub fn zip_key(coordinate: &ModuleCoordinate) -> StorageResult<String> {
    Ok(format!(
        "{}/@v/{}.zip",
        escape(&coordinate.source)?,
        escape(&coordinate.version)?
    ))
}

#[async_trait]
impl ZipStore for ObjectZipStore {
    async fn put_zip(&self, coordinate: &ModuleCoordinate, blob: Blob) -> StorageResult<()> {
        let key = zip_key(coordinate)?;
        debug!(module = %coordinate, size = blob.len(), "storing module archive");
        self.store.put(&key, blob.into_bytes()).await
    }

    async fn get_zip(&self, coordinate: &ModuleCoordinate) -> StorageResult<Blob> {
        let key = zip_key(coordinate)?;
        let bytes = self.store.get(&key).await.map_err(|e| match e {
            StorageError::NotFound(_) => StorageError::NotFound(coordinate.to_string()),
            other => other,
        })?;
        Ok(Blob::from(bytes))
    }

    async fn del_zip(&self, coordinate: &ModuleCoordinate) -> StorageResult<()> {
        let key = zip_key(coordinate)?;
        match self.store.delete(&key).await {
            Err(StorageError::NotFound(_)) => Ok(()),
            other => other,
        }
    }
}
