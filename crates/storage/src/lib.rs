//! Module archive storage for modprox.
//!
//! This crate provides:
//! - A flat object store abstraction with atomic writes
//! - A local filesystem backend
//! - [`ZipStore`], the coordinate-keyed archive store the proxy serves from

pub mod backends;
pub mod error;
pub mod traits;
pub mod zips;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::ObjectStore;
pub use zips::{ObjectZipStore, ZipStore, zip_key};

use modprox_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Create the archive store from configuration.
pub async fn zip_store_from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ZipStore>> {
    let objects = from_config(config).await?;
    Ok(Arc::new(ObjectZipStore::new(objects)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::tempdir;

    #[tokio::test]
    async fn from_config_filesystem_ok() {
        let temp = tempdir().unwrap();
        let config = StorageConfig::Filesystem {
            path: temp.path().join("store"),
        };

        let store = from_config(&config).await.unwrap();
        store
            .put("hello.txt", Bytes::from_static(b"hi"))
            .await
            .unwrap();
        assert_eq!(store.get("hello.txt").await.unwrap(), Bytes::from_static(b"hi"));
        assert_eq!(store.backend_name(), "filesystem");
    }
}
