//! Common test utilities: a proxy wired to temporary storage, plus fake
//! registry and upstream clients for driving the reconciler.

use async_trait::async_trait;
use modprox_core::config::{DatabaseConfig, ProxyConfig, StorageConfig};
use modprox_core::zipfile::build_archive;
use modprox_core::{Blob, ModuleCoordinate, RangeIds, SerialCoordinate};
use modprox_index::{Index, SqliteIndex};
use modprox_proxy::registry::{RegistryClientError, RegistryClientResult};
use modprox_proxy::{AppState, ProblemTracker, RegistryClient, create_router};
use modprox_storage::{FilesystemBackend, ObjectStore};
use modprox_upstream::{FetchRequest, ProxyClient, UpstreamClient, UpstreamError, UpstreamResult};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut ProxyConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let storage_path = temp_dir.path().join("zips");
        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend"),
        );

        let db_path = temp_dir.path().join("index.db");
        let index: Arc<dyn Index> = Arc::new(
            SqliteIndex::new(&db_path, None)
                .await
                .expect("Failed to create index"),
        );

        let mut config = ProxyConfig::for_testing();
        config.storage = StorageConfig::Filesystem { path: storage_path };
        config.index = DatabaseConfig::sqlite(db_path);
        modifier(&mut config);

        let state = AppState::new(config, storage, index, Arc::new(ProblemTracker::new()));
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }
}

#[allow(dead_code)]
pub fn coordinate(source: &str, version: &str) -> ModuleCoordinate {
    ModuleCoordinate::new(source, version).expect("valid coordinate")
}

#[allow(dead_code)]
pub fn serial(source: &str, version: &str, id: i64) -> SerialCoordinate {
    SerialCoordinate::new(coordinate(source, version), id)
}

/// A raw upstream archive with a single top-level directory.
#[allow(dead_code)]
pub fn raw_archive(top: &str, mod_file: Option<&str>) -> Blob {
    let go_mod = format!("{top}/go.mod");
    let main = format!("{top}/main.go");
    let mut entries: Vec<(&str, &[u8])> = vec![(main.as_str(), b"package main\n".as_slice())];
    if let Some(text) = mod_file {
        entries.push((go_mod.as_str(), text.as_bytes()));
    }
    build_archive(entries).expect("archive builds")
}

/// Registry fake answering the range-diff endpoint from a fixed catalog.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeRegistry {
    pub catalog: Vec<SerialCoordinate>,
    pub fail: bool,
    pub requests: Mutex<Vec<Value>>,
}

#[allow(dead_code)]
impl FakeRegistry {
    pub fn new(catalog: Vec<SerialCoordinate>) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn post(&self, path: &str, body: &Value) -> RegistryClientResult<Value> {
        self.requests.lock().unwrap().push(body.clone());
        if self.fail {
            return Err(RegistryClientError::Status {
                url: path.to_string(),
                status: 503,
            });
        }
        let ids: RangeIds = serde_json::from_value(body["ids"].clone())?;
        let serials: Vec<&SerialCoordinate> = self
            .catalog
            .iter()
            .filter(|s| !ids.contains(s.serial_id))
            .collect();
        Ok(json!({ "serials": serials }))
    }
}

/// Upstream fake serving archives by request URL.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeUpstream {
    pub archives: HashMap<String, Blob>,
    pub fetches: AtomicUsize,
}

#[allow(dead_code)]
impl FakeUpstream {
    pub fn with(mut self, url: &str, blob: Blob) -> Self {
        self.archives.insert(url.to_string(), blob);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    fn protocols(&self) -> &[&'static str] {
        &["https"]
    }

    async fn get(&self, request: &FetchRequest) -> UpstreamResult<Blob> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let url = request.url();
        self.archives
            .get(&url)
            .cloned()
            .ok_or(UpstreamError::Status { url, status: 404 })
    }
}

/// Open proxy fake serving already-normalized archives.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeOpenProxy {
    pub archives: HashMap<ModuleCoordinate, Blob>,
    pub fetches: AtomicUsize,
}

#[allow(dead_code)]
impl FakeOpenProxy {
    pub fn with(mut self, module: ModuleCoordinate, blob: Blob) -> Self {
        self.archives.insert(module, blob);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyClient for FakeOpenProxy {
    async fn get(&self, coordinate: &ModuleCoordinate) -> UpstreamResult<Blob> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.archives
            .get(coordinate)
            .cloned()
            .ok_or_else(|| UpstreamError::Status {
                url: coordinate.to_string(),
                status: 410,
            })
    }

    async fn list(&self, source: &str) -> UpstreamResult<Vec<String>> {
        Ok(self
            .archives
            .keys()
            .filter(|c| c.source == source)
            .map(|c| c.version.clone())
            .collect())
    }
}
