//! Reconciliation problem endpoints.

use crate::error::{ApiError, ApiResult};
use crate::problems::Problem;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use modprox_core::ModuleCoordinate;
use modprox_core::escape::unescape;

/// GET /v1/problems
pub async fn list_problems(State(state): State<AppState>) -> Json<Vec<Problem>> {
    Json(state.problems.problems())
}

/// GET /v1/problems/{source}/@v/{version}
pub async fn get_problem(
    State(state): State<AppState>,
    Path(module): Path<String>,
) -> ApiResult<Json<Problem>> {
    let (source, version) = module
        .rsplit_once("/@v/")
        .ok_or_else(|| ApiError::BadRequest(format!("expected {{source}}/@v/{{version}}, got {module}")))?;
    let coordinate = ModuleCoordinate::new(unescape(source)?, unescape(version)?)?;

    state
        .problems
        .problem(&coordinate)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no problem recorded for {coordinate}")))
}
