//! The transform steps a resolver applies to a fetch request.

use crate::error::UpstreamResult;
use crate::goget::GoGetRedirect;
use crate::path::PathShaper;
use crate::request::FetchRequest;
use modprox_core::config::TransformConfig;
use std::collections::BTreeMap;

/// Which kind of step a transform is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformKind {
    StaticRedirect,
    GoGet,
    Path,
    Headers,
    Transport,
}

impl TransformKind {
    /// Kinds whose presence marks a module as private, so the open proxy
    /// must not be used for it.
    pub fn is_policy_significant(self) -> bool {
        matches!(
            self,
            TransformKind::StaticRedirect | TransformKind::Headers | TransformKind::Transport
        )
    }
}

/// One step of the resolution pipeline. Each step returns a new request and
/// leaves its input untouched.
#[derive(Clone, Debug)]
pub enum Transform {
    StaticRedirect {
        original: String,
        substitution: String,
    },
    GoGet(GoGetRedirect),
    Path(PathShaper),
    Headers {
        domain: String,
        headers: BTreeMap<String, String>,
    },
    Transport {
        domain: String,
        transport: String,
    },
}

impl Transform {
    /// Build a transform from configuration. `client` is used for go-get
    /// discovery requests.
    pub fn from_config(config: &TransformConfig, client: &reqwest::Client) -> Self {
        match config {
            TransformConfig::StaticRedirect {
                original,
                substitution,
            } => Transform::StaticRedirect {
                original: original.clone(),
                substitution: substitution.clone(),
            },
            TransformConfig::GoGet { mode, domains } => {
                Transform::GoGet(GoGetRedirect::new(*mode, domains, client.clone()))
            }
            TransformConfig::Path { templates } => {
                Transform::Path(PathShaper::new(templates.as_ref()))
            }
            TransformConfig::Headers { domain, headers } => Transform::Headers {
                domain: domain.clone(),
                headers: headers.clone(),
            },
            TransformConfig::Transport { domain, transport } => Transform::Transport {
                domain: domain.clone(),
                transport: transport.clone(),
            },
        }
    }

    pub fn kind(&self) -> TransformKind {
        match self {
            Transform::StaticRedirect { .. } => TransformKind::StaticRedirect,
            Transform::GoGet(_) => TransformKind::GoGet,
            Transform::Path(_) => TransformKind::Path,
            Transform::Headers { .. } => TransformKind::Headers,
            Transform::Transport { .. } => TransformKind::Transport,
        }
    }

    pub async fn apply(&self, request: &FetchRequest) -> UpstreamResult<FetchRequest> {
        match self {
            Transform::StaticRedirect {
                original,
                substitution,
            } => {
                if request.domain != *original {
                    return Ok(request.clone());
                }
                Ok(FetchRequest {
                    domain: substitution.clone(),
                    ..request.clone()
                })
            }
            Transform::GoGet(redirect) => redirect.apply(request).await,
            Transform::Path(shaper) => shaper.apply(request),
            Transform::Headers { domain, headers } => {
                let mut next = request.clone();
                if next.domain == *domain {
                    for (name, value) in headers {
                        next.headers
                            .entry(name.clone())
                            .or_insert_with(|| value.clone());
                    }
                }
                Ok(next)
            }
            Transform::Transport { domain, transport } => {
                if request.domain != *domain {
                    return Ok(request.clone());
                }
                Ok(FetchRequest {
                    transport: transport.clone(),
                    ..request.clone()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modprox_core::ModuleCoordinate;

    fn request(source: &str) -> FetchRequest {
        FetchRequest::new(&ModuleCoordinate::new(source, "v1.0.0").unwrap())
    }

    #[tokio::test]
    async fn test_static_redirect_exact_match_only() {
        let t = Transform::StaticRedirect {
            original: "git.corp".to_string(),
            substitution: "mirror.corp".to_string(),
        };
        let out = t.apply(&request("git.corp/a/b")).await.unwrap();
        assert_eq!(out.domain, "mirror.corp");
        assert_eq!(out.namespace, ["a", "b"]);

        let untouched = request("git.corporate/a/b");
        assert_eq!(t.apply(&untouched).await.unwrap(), untouched);
    }

    #[tokio::test]
    async fn test_headers_merge_without_discarding() {
        let t = Transform::Headers {
            domain: "git.corp".to_string(),
            headers: BTreeMap::from([
                ("Authorization".to_string(), "token abc".to_string()),
                ("X-Existing".to_string(), "new".to_string()),
            ]),
        };
        let mut input = request("git.corp/a/b");
        input
            .headers
            .insert("X-Existing".to_string(), "old".to_string());

        let out = t.apply(&input).await.unwrap();
        assert_eq!(out.headers["Authorization"], "token abc");
        assert_eq!(out.headers["X-Existing"], "old");
        // input is not mutated
        assert_eq!(input.headers.len(), 1);
    }

    #[tokio::test]
    async fn test_transport_override() {
        let t = Transform::Transport {
            domain: "git.corp".to_string(),
            transport: "http".to_string(),
        };
        let out = t.apply(&request("git.corp/a/b")).await.unwrap();
        assert_eq!(out.transport, "http");
        assert_eq!(out.domain, "git.corp");
    }

    #[test]
    fn test_policy_significance() {
        assert!(TransformKind::StaticRedirect.is_policy_significant());
        assert!(TransformKind::Headers.is_policy_significant());
        assert!(TransformKind::Transport.is_policy_significant());
        assert!(!TransformKind::GoGet.is_policy_significant());
        assert!(!TransformKind::Path.is_policy_significant());
    }
}
