//! Download path templates.
//!
//! A template names namespace segments positionally (`ELEM1`, `ELEM2`, ...)
//! and the addressable version as `VERSION`.

use crate::error::{UpstreamError, UpstreamResult};
use crate::request::FetchRequest;
use modprox_core::version::addressable_version;
use std::collections::BTreeMap;

/// Templates for the hosting conventions known out of the box.
pub fn default_templates() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "github.com".to_string(),
            "ELEM1/ELEM2/archive/VERSION.zip".to_string(),
        ),
        (
            "gitlab.com".to_string(),
            "ELEM1/ELEM2/-/archive/VERSION/ELEM2-VERSION.zip".to_string(),
        ),
    ])
}

/// Per-domain path shaping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathShaper {
    templates: BTreeMap<String, String>,
    strict: bool,
}

impl PathShaper {
    /// Build from optional custom templates, layered over the defaults. With
    /// custom templates present, a domain without a template is an error.
    pub fn new(custom: Option<&BTreeMap<String, String>>) -> Self {
        let mut templates = default_templates();
        let strict = custom.is_some();
        if let Some(custom) = custom {
            templates.extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Self { templates, strict }
    }

    pub fn apply(&self, request: &FetchRequest) -> UpstreamResult<FetchRequest> {
        let template = match self.templates.get(&request.domain) {
            Some(template) => template.as_str(),
            None if self.strict => {
                return Err(UpstreamError::NoPathTemplate(request.domain.clone()));
            }
            None => "",
        };
        Ok(FetchRequest {
            path: expand(template, &request.namespace, &request.version),
            ..request.clone()
        })
    }
}

/// Substitute placeholders. Higher positions go first so `ELEM1` never eats
/// the prefix of `ELEM12`.
fn expand(template: &str, namespace: &[String], version: &str) -> String {
    let mut path = template.to_string();
    for (i, element) in namespace.iter().enumerate().rev() {
        path = path.replace(&format!("ELEM{}", i + 1), element);
    }
    path.replace("VERSION", addressable_version(version))
}
