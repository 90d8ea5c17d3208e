//! HTTP request handlers.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use modprox_core::{ModuleCoordinate, RangeIds, SerialCoordinate};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Modules to register.
#[derive(Debug, Deserialize)]
pub struct NewModulesRequest {
    pub modules: Vec<ModuleCoordinate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewModulesResponse {
    pub modules_added: usize,
}

/// Serial IDs a proxy already holds.
#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: RangeIds,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SerialsResponse {
    pub serials: Vec<SerialCoordinate>,
}

/// GET /v1/health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.catalog.health_check().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /v1/registry/sources/new - Register coordinates, assigning serial
/// IDs to the ones not seen before.
pub async fn register_modules(
    State(state): State<AppState>,
    Json(request): Json<NewModulesRequest>,
) -> ApiResult<Json<NewModulesResponse>> {
    // Deserialization skips constructor validation; redo it here.
    let modules = request
        .modules
        .into_iter()
        .map(|m| ModuleCoordinate::new(m.source, m.version))
        .collect::<Result<Vec<_>, _>>()?;

    let modules_added = state.catalog.register(&modules).await?;
    tracing::info!(
        submitted = modules.len(),
        added = modules_added,
        "modules registered"
    );
    Ok(Json(NewModulesResponse { modules_added }))
}

/// POST /v1/registry/sources/list - Everything a proxy holding `ids` lacks.
pub async fn missing_sources(
    State(state): State<AppState>,
    Json(request): Json<IdsRequest>,
) -> ApiResult<Json<SerialsResponse>> {
    let serials = state.catalog.missing(&request.ids).await?;
    tracing::debug!(missing = serials.len(), "computed range diff");
    Ok(Json(SerialsResponse { serials }))
}

/// GET /v1/registry/sources/list - The whole catalog.
pub async fn list_sources(State(state): State<AppState>) -> ApiResult<Json<SerialsResponse>> {
    let serials = state.catalog.all().await?;
    Ok(Json(SerialsResponse { serials }))
}
