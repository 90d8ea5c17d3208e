//! Application state shared across handlers.

use crate::problems::ProblemTracker;
use modprox_core::config::ProxyConfig;
use modprox_index::Index;
use modprox_storage::{ObjectStore, ObjectZipStore, ZipStore};
use std::sync::Arc;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub storage: Arc<dyn ObjectStore>,
    pub zips: Arc<dyn ZipStore>,
    pub index: Arc<dyn Index>,
    pub problems: Arc<ProblemTracker>,
}

impl AppState {
    pub fn new(
        config: ProxyConfig,
        storage: Arc<dyn ObjectStore>,
        index: Arc<dyn Index>,
        problems: Arc<ProblemTracker>,
    ) -> Self {
        let zips: Arc<dyn ZipStore> = Arc::new(ObjectZipStore::new(storage.clone()));
        Self {
            config: Arc::new(config),
            storage,
            zips,
            index,
            problems,
        }
    }
}
