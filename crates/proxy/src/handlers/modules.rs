//! Module protocol endpoints.
//!
//! Paths look like `/{source}/@v/list` or `/{source}/@v/{version}.{info,mod,zip}`
//! where both halves use the case-folding escape (`A` is written `!a`). Module
//! sources contain slashes, so these are served from the router fallback
//! rather than from typed routes.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use modprox_core::ModuleCoordinate;
use modprox_core::escape::unescape;
use modprox_index::ModuleRepo;
use tracing::info;

/// A parsed module protocol path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModulePath {
    List(String),
    Info(ModuleCoordinate),
    Mod(ModuleCoordinate),
    Zip(ModuleCoordinate),
    /// `/{source}/@v/{version}` with no suffix, the target of DELETE.
    Version(ModuleCoordinate),
}

impl ModulePath {
    /// Parse a request path. `Ok(None)` means the path is not a module
    /// protocol path at all.
    pub fn parse(path: &str) -> ApiResult<Option<Self>> {
        let Some((source, rest)) = path.trim_start_matches('/').rsplit_once("/@v/") else {
            return Ok(None);
        };
        if source.is_empty() || rest.is_empty() {
            return Ok(None);
        }
        let source = unescape(source)?;

        if rest == "list" {
            return Ok(Some(Self::List(source)));
        }

        let coordinate = |escaped: &str| -> ApiResult<ModuleCoordinate> {
            Ok(ModuleCoordinate::new(source.clone(), unescape(escaped)?)?)
        };
        let parsed = if let Some(v) = rest.strip_suffix(".info") {
            Self::Info(coordinate(v)?)
        } else if let Some(v) = rest.strip_suffix(".mod") {
            Self::Mod(coordinate(v)?)
        } else if let Some(v) = rest.strip_suffix(".zip") {
            Self::Zip(coordinate(v)?)
        } else {
            Self::Version(coordinate(rest)?)
        };
        Ok(Some(parsed))
    }
}

/// Fallback handler serving the module protocol.
pub async fn module_fallback(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let parsed = match ModulePath::parse(uri.path()) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Err(e) => return e.into_response(),
    };

    let result = match (method, parsed) {
        (Method::GET, ModulePath::List(source)) => list_versions(&state, &source).await,
        (Method::GET, ModulePath::Info(c)) => get_info(&state, &c).await,
        (Method::GET, ModulePath::Mod(c)) => get_mod(&state, &c).await,
        (Method::GET, ModulePath::Zip(c)) => get_zip(&state, &c).await,
        (Method::DELETE, ModulePath::Version(c)) => remove_module(&state, &c).await,
        (Method::GET, ModulePath::Version(c)) => {
            Err(ApiError::NotFound(format!("no such resource for {c}")))
        }
        _ => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };
    result.unwrap_or_else(|e| e.into_response())
}

/// GET /{source}/@v/list - Newline separated versions, oldest first.
async fn list_versions(state: &AppState, source: &str) -> ApiResult<Response> {
    let versions = state.index.versions(source).await?;
    let mut body = versions.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

/// GET /{source}/@v/{version}.info
async fn get_info(state: &AppState, coordinate: &ModuleCoordinate) -> ApiResult<Response> {
    let info = state.index.info(coordinate).await?;
    Ok(Json(info).into_response())
}

/// GET /{source}/@v/{version}.mod
async fn get_mod(state: &AppState, coordinate: &ModuleCoordinate) -> ApiResult<Response> {
    let mod_file = state.index.mod_file(coordinate).await?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        mod_file,
    )
        .into_response())
}

/// GET /{source}/@v/{version}.zip
async fn get_zip(state: &AppState, coordinate: &ModuleCoordinate) -> ApiResult<Response> {
    let blob = state.zips.get_zip(coordinate).await?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "application/zip")],
        blob.into_bytes(),
    )
        .into_response())
}

/// DELETE /{source}/@v/{version} - Forget a module. The index goes first so
/// the version stops being listed before its archive disappears.
async fn remove_module(state: &AppState, coordinate: &ModuleCoordinate) -> ApiResult<Response> {
    state.index.remove(coordinate).await?;
    state.zips.del_zip(coordinate).await?;
    info!(source = %coordinate.source, version = %coordinate.version, "module removed");
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate(source: &str, version: &str) -> ModuleCoordinate {
        ModuleCoordinate::new(source, version).unwrap()
    }

    #[test]
    fn test_parse_protocol_paths() {
        assert_eq!(
            ModulePath::parse("/github.com/!azure/sdk/@v/list").unwrap(),
            Some(ModulePath::List("github.com/Azure/sdk".to_string()))
        );
        assert_eq!(
            ModulePath::parse("/golang.org/x/tools/@v/v0.1.0.info").unwrap(),
            Some(ModulePath::Info(coordinate("golang.org/x/tools", "v0.1.0")))
        );
        assert_eq!(
            ModulePath::parse("/golang.org/x/tools/@v/v0.1.0.mod").unwrap(),
            Some(ModulePath::Mod(coordinate("golang.org/x/tools", "v0.1.0")))
        );
        assert_eq!(
            ModulePath::parse("/golang.org/x/tools/@v/v0.1.0-!r!c1.zip").unwrap(),
            Some(ModulePath::Zip(coordinate("golang.org/x/tools", "v0.1.0-RC1")))
        );
        assert_eq!(
            ModulePath::parse("/golang.org/x/tools/@v/v0.1.0").unwrap(),
            Some(ModulePath::Version(coordinate("golang.org/x/tools", "v0.1.0")))
        );
    }

    #[test]
    fn test_parse_non_module_paths() {
        assert_eq!(ModulePath::parse("/favicon.ico").unwrap(), None);
        assert_eq!(ModulePath::parse("/@v/list").unwrap(), None);
        assert_eq!(ModulePath::parse("/a.io/m/@v/").unwrap(), None);
    }

    #[test]
    fn test_parse_bad_escape() {
        let err = ModulePath::parse("/github.com/Azure/sdk/@v/list").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let err = ModulePath::parse("/github.com/x/@v/v1.0.0!.zip").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
