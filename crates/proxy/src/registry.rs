//! Client for the registry that assigns serial IDs to modules.

use async_trait::async_trait;
use modprox_core::config::RegistryClientConfig;
use modprox_core::{RangeIds, SerialCoordinate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Path of the registry's range-diff endpoint.
pub const SOURCES_LIST_PATH: &str = "/v1/registry/sources/list";

#[derive(Debug, thiserror::Error)]
pub enum RegistryClientError {
    #[error("no registry instances configured")]
    NoInstances,

    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid registry response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type RegistryClientResult<T> = std::result::Result<T, RegistryClientError>;

/// JSON-over-HTTP access to the registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn post(&self, path: &str, body: &Value) -> RegistryClientResult<Value>;
}

/// Body of a range-diff request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdsRequest {
    pub ids: RangeIds,
}

/// Body of a range-diff response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialsResponse {
    pub serials: Vec<SerialCoordinate>,
}

/// Ask the registry which modules are missing from a proxy holding `ids`.
pub async fn needed(
    client: &dyn RegistryClient,
    ids: &RangeIds,
) -> RegistryClientResult<Vec<SerialCoordinate>> {
    let body = serde_json::to_value(IdsRequest { ids: ids.clone() })?;
    let response = client.post(SOURCES_LIST_PATH, &body).await?;
    let serials: SerialsResponse = serde_json::from_value(response)?;
    Ok(serials.serials)
}

/// Registry client over HTTP. Instances are tried in configured order and
/// the first successful response wins.
#[derive(Clone, Debug)]
pub struct HttpRegistryClient {
    http: reqwest::Client,
    instances: Vec<String>,
}

impl HttpRegistryClient {
    pub fn new(instances: Vec<String>, http: reqwest::Client) -> Self {
        let instances = instances
            .into_iter()
            .map(|i| i.trim_end_matches('/').to_string())
            .collect();
        Self { http, instances }
    }

    pub fn from_config(config: &RegistryClientConfig) -> RegistryClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("modprox/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;
        Ok(Self::new(config.instances.clone(), http))
    }

    async fn post_to(&self, instance: &str, path: &str, body: &Value) -> RegistryClientResult<Value> {
        let url = format!("{instance}{path}");
        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryClientError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn post(&self, path: &str, body: &Value) -> RegistryClientResult<Value> {
        let mut last_error = RegistryClientError::NoInstances;
        for instance in &self.instances {
            match self.post_to(instance, path, body).await {
                Ok(value) => {
                    debug!(instance = %instance, path = %path, "registry request succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(instance = %instance, path = %path, error = %e, "registry instance failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
