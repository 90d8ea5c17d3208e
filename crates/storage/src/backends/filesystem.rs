//! Object store rooted at a local directory.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Stores each key as a file under `root`.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create the backend, creating `root` if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Resolve a key to a path inside the root.
    ///
    /// Canonicalization touches the filesystem, so it runs on the blocking pool.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || resolve_key(&root, &key))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }
}

/// Reject keys that could leave `root`, either lexically or through a
/// symlink somewhere along the path.
fn resolve_key(root: &Path, key: &str) -> StorageResult<PathBuf> {
    if key.is_empty() {
        return Ok(root.to_path_buf());
    }
    let lexically_safe = !key.starts_with(['/', '\\'])
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !lexically_safe {
        return Err(StorageError::InvalidKey(format!("key leaves storage root: {key}")));
    }

    let path = root.join(key);
    let anchor = root.canonicalize()?;

    // Only the deepest ancestor that already exists can hide a symlink.
    for ancestor in path.ancestors() {
        match std::fs::symlink_metadata(ancestor) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StorageError::Io(e)),
            Ok(_) => {
                let real = ancestor.canonicalize().map_err(|_| {
                    StorageError::InvalidKey(format!("broken symlink under key: {key}"))
                })?;
                if !real.starts_with(&anchor) {
                    return Err(StorageError::InvalidKey(format!(
                        "key leaves storage root via symlink: {key}"
                    )));
                }
                break;
            }
        }
    }
    Ok(path)
}

/// Maps a missing file to [`StorageError::NotFound`] for `key`.
fn io_error_for(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |e| match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
        _ => StorageError::Io(e),
    }
}

/// Staging files carry a `.partial-<uuid>` suffix until renamed into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".partial-{}", Uuid::new_v4().simple()));
    path.with_file_name(name)
}

async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    let staging = staging_path(path);
    let mut file = fs::File::create(&staging).await?;
    let written = async {
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&staging, path).await
    }
    .await;
    if let Err(e) = written {
        let _ = fs::remove_file(&staging).await;
        return Err(StorageError::Io(e));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key).await?;
        let data = fs::read(&path).await.map_err(io_error_for(key))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        write_atomic(&path, &data).await
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        fs::remove_file(&path).await.map_err(io_error_for(key))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("{} is not a directory", self.root.display()),
            ))),
            Err(e) => Err(StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("cannot stat {}: {e}", self.root.display()),
            ))),
        }
    }
}
