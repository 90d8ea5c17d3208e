//! Clients that download raw archives from upstream hosts.

use crate::error::{UpstreamError, UpstreamResult};
use crate::request::FetchRequest;
use async_trait::async_trait;
use modprox_core::Blob;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Downloads the raw archive a fetch request points at.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Transports this client can serve.
    fn protocols(&self) -> &[&'static str];

    async fn get(&self, request: &FetchRequest) -> UpstreamResult<Blob>;
}

/// Shared reqwest client with the proxy's user agent and a request timeout.
pub fn build_http_client(timeout: Duration) -> UpstreamResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("modprox/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Plain HTTP(S) downloads.
#[derive(Clone, Debug)]
pub struct HttpClient {
    http: reqwest::Client,
}

impl HttpClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl UpstreamClient for HttpClient {
    fn protocols(&self) -> &[&'static str] {
        &["http", "https"]
    }

    #[instrument(skip(self, request), fields(domain = %request.domain))]
    async fn get(&self, request: &FetchRequest) -> UpstreamResult<Blob> {
        if request.path.is_empty() {
            return Err(UpstreamError::EmptyPath(request.domain.clone()));
        }
        let url = request.url();
        let mut builder = self.http.get(&url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        debug!(url = %url, size = bytes.len(), "downloaded upstream archive");
        Ok(Blob::from(bytes))
    }
}

/// Dispatches to the client registered for a request's transport.
#[derive(Clone, Default)]
pub struct TransportClients {
    clients: HashMap<&'static str, Arc<dyn UpstreamClient>>,
}

impl TransportClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` for every transport it reports.
    pub fn register(mut self, client: Arc<dyn UpstreamClient>) -> Self {
        for protocol in client.protocols() {
            self.clients.insert(*protocol, client.clone());
        }
        self
    }
}

#[async_trait]
impl UpstreamClient for TransportClients {
    fn protocols(&self) -> &[&'static str] {
        &[]
    }

    async fn get(&self, request: &FetchRequest) -> UpstreamResult<Blob> {
        let client = self
            .clients
            .get(request.transport.as_str())
            .ok_or_else(|| UpstreamError::UnsupportedTransport(request.transport.clone()))?;
        client.get(request).await
    }
}
