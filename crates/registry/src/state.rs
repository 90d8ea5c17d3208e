//! Application state shared across handlers.

use crate::catalog::Catalog;
use modprox_core::config::RegistryConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RegistryConfig>,
    pub catalog: Arc<dyn Catalog>,
}

impl AppState {
    pub fn new(config: RegistryConfig, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
        }
    }
}
