//! The modprox proxy server.
//!
//! This crate provides:
//! - The module protocol endpoints served from the index and archive store
//! - The reconciliation worker that keeps this proxy in step with the registry
//! - Problem tracking, health, summary and Prometheus metrics endpoints

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod problems;
pub mod reconciler;
pub mod registry;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use problems::{Problem, ProblemTracker};
pub use reconciler::{CycleReport, Outcome, Reconciler};
pub use registry::{HttpRegistryClient, RegistryClient};
pub use routes::create_router;
pub use state::AppState;
