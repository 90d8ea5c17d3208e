//! Client for an open module proxy speaking the module protocol.

use crate::error::{UpstreamError, UpstreamResult};
use async_trait::async_trait;
use modprox_core::escape::escape;
use modprox_core::{Blob, ModuleCoordinate};
use reqwest::Url;
use tracing::{debug, instrument};

/// A remote that already serves normalized module archives.
#[async_trait]
pub trait ProxyClient: Send + Sync {
    async fn get(&self, coordinate: &ModuleCoordinate) -> UpstreamResult<Blob>;

    async fn list(&self, source: &str) -> UpstreamResult<Vec<String>>;
}

#[derive(Clone, Debug)]
pub struct OpenProxyClient {
    http: reqwest::Client,
    base_url: Url,
}

impl OpenProxyClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> UpstreamResult<Self> {
        // A trailing slash keeps Url::join from replacing the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|e| UpstreamError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> UpstreamResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn fetch(&self, url: Url) -> UpstreamResult<reqwest::Response> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ProxyClient for OpenProxyClient {
    #[instrument(skip(self), fields(module = %coordinate))]
    async fn get(&self, coordinate: &ModuleCoordinate) -> UpstreamResult<Blob> {
        let url = self.url(&format!(
            "{}/@v/{}.zip",
            escape(&coordinate.source)?,
            escape(&coordinate.version)?
        ))?;
        let bytes = self.fetch(url).await?.bytes().await?;
        debug!(size = bytes.len(), "downloaded archive from open proxy");
        Ok(Blob::from(bytes))
    }

    async fn list(&self, source: &str) -> UpstreamResult<Vec<String>> {
        let url = self.url(&format!("{}/@v/list", escape(source)?))?;
        let body = self.fetch(url).await?.text().await?;
        Ok(body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_keeps_base_path() {
        let client =
            OpenProxyClient::new("https://proxy.example.com/go", reqwest::Client::new()).unwrap();
        let url = client.url("github.com/!azure/sdk/@v/list").unwrap();
        assert_eq!(
            url.as_str(),
            "https://proxy.example.com/go/github.com/!azure/sdk/@v/list"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(OpenProxyClient::new("not a url", reqwest::Client::new()).is_err());
    }
}
