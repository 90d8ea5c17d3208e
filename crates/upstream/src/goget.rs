//! go-get metadata discovery.
//!
//! Vanity import hosts answer `?go-get=1` with `<meta>` tags naming where the
//! code actually lives. `go-source` is preferred over `go-import`.

use crate::error::{UpstreamError, UpstreamResult};
use crate::request::FetchRequest;
use modprox_core::config::GoGetMode;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Domains known to serve go-get redirects.
pub const KNOWN_REDIRECT_DOMAINS: &[&str] = &[
    "cloud.google.com",
    "go.etcd.io",
    "go.opencensus.io",
    "go.opentelemetry.io",
    "go.uber.org",
    "gocloud.dev",
    "golang.org",
    "gonum.org",
    "google.golang.org",
    "gopkg.in",
    "gotest.tools",
    "honnef.co",
    "k8s.io",
    "mvdan.cc",
    "sigs.k8s.io",
];

static META_NAMES: [&str; 2] = ["go-source", "go-import"];

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(https?)://([\w.-]+(?::\d+)?)/([\w./-]+)").expect("location pattern is valid")
});

/// Redirect requests by following go-get meta tags.
#[derive(Clone, Debug)]
pub struct GoGetRedirect {
    mode: GoGetMode,
    domains: BTreeSet<String>,
    client: reqwest::Client,
}

impl GoGetRedirect {
    pub fn new(mode: GoGetMode, domains: &[String], client: reqwest::Client) -> Self {
        let mut all: BTreeSet<String> = domains.iter().cloned().collect();
        all.extend(KNOWN_REDIRECT_DOMAINS.iter().map(|d| d.to_string()));
        Self {
            mode,
            domains: all,
            client,
        }
    }

    pub fn applies_to(&self, domain: &str) -> bool {
        match self.mode {
            GoGetMode::Automatic => true,
            GoGetMode::Selective => self.domains.contains(domain),
        }
    }

    pub async fn apply(&self, request: &FetchRequest) -> UpstreamResult<FetchRequest> {
        if !self.applies_to(&request.domain) {
            return Ok(request.clone());
        }
        match (self.discover(request).await, self.mode) {
            (Ok(redirected), _) => Ok(redirected),
            (Err(e), GoGetMode::Selective) => Err(e),
            (Err(e), GoGetMode::Automatic) => {
                debug!(domain = %request.domain, error = %e, "go-get discovery skipped");
                Ok(request.clone())
            }
        }
    }

    async fn discover(&self, request: &FetchRequest) -> UpstreamResult<FetchRequest> {
        let url = request.go_get_url();
        let failure = |reason: String| UpstreamError::Discovery {
            domain: request.domain.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("{url} returned HTTP {status}")));
        }
        let body = response.text().await.map_err(|e| failure(e.to_string()))?;

        let content = META_NAMES
            .iter()
            .find_map(|name| meta_content(&body, name))
            .ok_or_else(|| failure("no go-source or go-import meta tag".to_string()))?;
        let (transport, domain, namespace) =
            parse_location(&content).ok_or_else(|| failure(format!("no location in {content:?}")))?;

        if domain == request.domain && namespace == request.namespace {
            warn!(domain = %domain, "go-get meta tag points back at itself");
        }

        Ok(FetchRequest {
            transport,
            domain,
            namespace,
            path: String::new(),
            ..request.clone()
        })
    }
}

/// Content of the first `<meta name="{name}" content="...">` tag.
fn meta_content(body: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?is)<meta\s+[^>]*name\s*=\s*["']{}["'][^>]*content\s*=\s*["']([^"']*)["']"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(body).map(|c| c[1].to_string())
}

/// Pull `(scheme, host, path segments)` out of a meta tag's content.
fn parse_location(content: &str) -> Option<(String, String, Vec<String>)> {
    let caps = LOCATION.captures(content)?;
    let path = caps[3].trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let namespace = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Some((caps[1].to_string(), caps[2].to_string(), namespace))
}
