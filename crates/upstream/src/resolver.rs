//! Coordinate to fetch request resolution.

use crate::error::UpstreamResult;
use crate::request::FetchRequest;
use crate::transform::Transform;
use modprox_core::ModuleCoordinate;
use modprox_core::config::UpstreamConfig;
use tracing::trace;

/// Runs the configured transforms, in order, over a coordinate's default
/// request.
#[derive(Clone, Debug, Default)]
pub struct Resolver {
    transforms: Vec<Transform>,
}

impl Resolver {
    pub fn new(transforms: Vec<Transform>) -> Self {
        Self { transforms }
    }

    pub fn from_config(config: &UpstreamConfig, client: &reqwest::Client) -> Self {
        Self::new(
            config
                .transforms
                .iter()
                .map(|t| Transform::from_config(t, client))
                .collect(),
        )
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// Build the fetch request for `coordinate`.
    ///
    /// An empty path in the result is not an error here; the fetch fails.
    pub async fn resolve(&self, coordinate: &ModuleCoordinate) -> UpstreamResult<FetchRequest> {
        let mut request = FetchRequest::new(coordinate);
        for transform in &self.transforms {
            request = transform.apply(&request).await?;
            trace!(module = %coordinate, kind = ?transform.kind(), url = %request.url(), "applied transform");
        }
        Ok(request)
    }

    /// Whether the open proxy may serve `coordinate`.
    ///
    /// Only redirect, header and transport transforms are consulted; any of
    /// them changing the default request marks the module private.
    pub async fn use_proxy(&self, coordinate: &ModuleCoordinate) -> UpstreamResult<bool> {
        let original = FetchRequest::new(coordinate);
        let mut request = original.clone();
        for transform in self
            .transforms
            .iter()
            .filter(|t| t.kind().is_policy_significant())
        {
            request = transform.apply(&request).await?;
        }
        Ok(request == original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathShaper;
    use std::collections::BTreeMap;

    fn coordinate(source: &str, version: &str) -> ModuleCoordinate {
        ModuleCoordinate::new(source, version).unwrap()
    }

    fn private_resolver() -> Resolver {
        Resolver::new(vec![
            Transform::Path(PathShaper::new(None)),
            Transform::StaticRedirect {
                original: "git.corp".to_string(),
                substitution: "mirror.corp".to_string(),
            },
            Transform::Headers {
                domain: "tokens.corp".to_string(),
                headers: BTreeMap::from([("Authorization".to_string(), "x".to_string())]),
            },
            Transform::Transport {
                domain: "plain.corp".to_string(),
                transport: "http".to_string(),
            },
        ])
    }

    #[tokio::test]
    async fn test_resolve_github() {
        let resolver = Resolver::new(vec![Transform::Path(PathShaper::new(None))]);
        let req = resolver
            .resolve(&coordinate("github.com/foo/bar", "v2.0.0"))
            .await
            .unwrap();
        assert_eq!(req.path, "foo/bar/archive/v2.0.0.zip");
        assert_eq!(req.url(), "https://github.com/foo/bar/archive/v2.0.0.zip");
    }

    #[tokio::test]
    async fn test_resolve_is_deterministic() {
        let resolver = private_resolver();
        let c = coordinate("git.corp/team/lib", "v1.2.3");
        let a = resolver.resolve(&c).await.unwrap();
        let b = resolver.resolve(&c).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.domain, "mirror.corp");
    }

    #[tokio::test]
    async fn test_transforms_apply_in_order() {
        // path shaping ran before the redirect, so the redirected domain has
        // no say in the path
        let resolver = Resolver::new(vec![
            Transform::Path(PathShaper::new(None)),
            Transform::StaticRedirect {
                original: "github.com".to_string(),
                substitution: "gitlab.com".to_string(),
            },
        ]);
        let req = resolver
            .resolve(&coordinate("github.com/a/b", "v1.0.0"))
            .await
            .unwrap();
        assert_eq!(req.domain, "gitlab.com");
        assert_eq!(req.path, "a/b/archive/v1.0.0.zip");
    }

    #[tokio::test]
    async fn test_resolve_propagates_failure() {
        let strict = BTreeMap::from([("git.corp".to_string(), "ELEM1/VERSION".to_string())]);
        let resolver = Resolver::new(vec![Transform::Path(PathShaper::new(Some(&strict)))]);
        assert!(
            resolver
                .resolve(&coordinate("unknown.host/a", "v1.0.0"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_use_proxy() {
        let resolver = private_resolver();
        assert!(
            resolver
                .use_proxy(&coordinate("github.com/public/repo", "v1.0.0"))
                .await
                .unwrap()
        );
        for private in [
            "git.corp/team/lib",
            "tokens.corp/team/lib",
            "plain.corp/team/lib",
        ] {
            assert!(
                !resolver
                    .use_proxy(&coordinate(private, "v1.0.0"))
                    .await
                    .unwrap(),
                "{private} should not use the open proxy"
            );
        }
    }

    #[tokio::test]
    async fn test_use_proxy_ignores_transform_order() {
        let mut transforms = private_resolver().transforms().to_vec();
        transforms.reverse();
        let reversed = Resolver::new(transforms);
        assert!(
            !reversed
                .use_proxy(&coordinate("git.corp/team/lib", "v1.0.0"))
                .await
                .unwrap()
        );
        assert!(
            reversed
                .use_proxy(&coordinate("github.com/public/repo", "v1.0.0"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_resolver_uses_proxy() {
        let resolver = Resolver::default();
        let c = coordinate("example.org", "v0.1.0");
        assert!(resolver.use_proxy(&c).await.unwrap());
        assert!(resolver.resolve(&c).await.unwrap().path.is_empty());
    }
}
