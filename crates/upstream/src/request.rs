//! Fetch requests produced by the resolver.

use modprox_core::ModuleCoordinate;
use std::collections::BTreeMap;

/// Everything needed to download one raw archive from an upstream host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// URL scheme, `https` unless overridden.
    pub transport: String,
    pub domain: String,
    /// Source path segments after the domain.
    pub namespace: Vec<String>,
    pub version: String,
    /// Download path below the domain. Only path transforms set this.
    pub path: String,
    pub headers: BTreeMap<String, String>,
}

impl FetchRequest {
    /// The untransformed request for a coordinate.
    pub fn new(coordinate: &ModuleCoordinate) -> Self {
        let mut segments = coordinate.source.split('/').map(str::to_string);
        let domain = segments.next().unwrap_or_default();
        Self {
            transport: "https".to_string(),
            domain,
            namespace: segments.collect(),
            version: coordinate.version.clone(),
            path: String::new(),
            headers: BTreeMap::new(),
        }
    }

    /// The download URL. Meaningless until a path has been set.
    pub fn url(&self) -> String {
        format!(
            "{}://{}/{}",
            self.transport,
            self.domain,
            self.path.trim_start_matches('/')
        )
    }

    /// The go-get discovery URL for the request's current location.
    pub fn go_get_url(&self) -> String {
        if self.namespace.is_empty() {
            format!("{}://{}?go-get=1", self.transport, self.domain)
        } else {
            format!(
                "{}://{}/{}?go-get=1",
                self.transport,
                self.domain,
                self.namespace.join("/")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request() {
        let c = ModuleCoordinate::new("github.com/foo/bar", "v1.0.0").unwrap();
        let req = FetchRequest::new(&c);
        assert_eq!(req.transport, "https");
        assert_eq!(req.domain, "github.com");
        assert_eq!(req.namespace, ["foo", "bar"]);
        assert_eq!(req.version, "v1.0.0");
        assert!(req.path.is_empty());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_single_segment_source() {
        let c = ModuleCoordinate::new("example.org", "v0.1.0").unwrap();
        let req = FetchRequest::new(&c);
        assert_eq!(req.domain, "example.org");
        assert!(req.namespace.is_empty());
        assert_eq!(req.go_get_url(), "https://example.org?go-get=1");
    }

    #[test]
    fn test_urls() {
        let c = ModuleCoordinate::new("github.com/foo/bar", "v1.0.0").unwrap();
        let mut req = FetchRequest::new(&c);
        assert_eq!(req.go_get_url(), "https://github.com/foo/bar?go-get=1");
        req.path = "foo/bar/archive/v1.0.0.zip".to_string();
        assert_eq!(
            req.url(),
            "https://github.com/foo/bar/archive/v1.0.0.zip"
        );
    }
}
