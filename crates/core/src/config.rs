//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:9000".to_string()
}

fn default_registry_bind() -> String {
    "127.0.0.1:9100".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Blob storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for module archives.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/zips"),
        }
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Database configuration, used by the proxy index and the registry catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// Embedded SQLite database.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Query timeout in seconds (advisory only, SQLite cannot cancel queries).
        #[serde(default = "default_sqlite_query_timeout_secs")]
        query_timeout_secs: Option<u64>,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        host: Option<String>,
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        username: Option<String>,
        /// Prefer setting this through the environment over the config file.
        password: Option<String>,
        database: Option<String>,
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds.
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

fn default_sqlite_query_timeout_secs() -> Option<u64> {
    Some(60)
}

impl DatabaseConfig {
    /// SQLite database at `path` with default settings.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::Sqlite {
            path: path.into(),
            query_timeout_secs: default_sqlite_query_timeout_secs(),
        }
    }

    /// Validate database configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            DatabaseConfig::Sqlite { .. } => Ok(()),
            DatabaseConfig::Postgres {
                url,
                host,
                database,
                max_connections,
                ..
            } => {
                if *max_connections == 0 {
                    return Err("postgres max_connections must be at least 1".to_string());
                }
                match (url.as_ref(), host.as_ref(), database.as_ref()) {
                    (Some(_), _, _) => Ok(()),
                    (None, Some(_), Some(_)) => Ok(()),
                    (None, None, _) => Err(
                        "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                    ),
                    (None, Some(_), None) => Err(
                        "postgres config requires 'database' when using individual fields"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// Client side of the registry, as seen by a proxy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryClientConfig {
    /// Registry base URLs, tried in order until one answers.
    #[serde(default = "default_registry_instances")]
    pub instances: Vec<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_registry_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_registry_instances() -> Vec<String> {
    vec!["http://127.0.0.1:9100".to_string()]
}

fn default_registry_timeout_secs() -> u64 {
    30
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self {
            instances: default_registry_instances(),
            timeout_secs: default_registry_timeout_secs(),
        }
    }
}

impl RegistryClientConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.instances.is_empty() {
            return Err("registry.instances must name at least one registry".to_string());
        }
        Ok(())
    }
}

/// Which domains the go-get discovery transform applies to.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoGetMode {
    /// Only configured domains plus the built-in list. Failures are errors.
    #[default]
    Selective,
    /// Every domain. Failures leave the request untouched.
    Automatic,
}

/// One step of the upstream resolution pipeline, applied in declaration order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformConfig {
    /// Replace `original` with `substitution` when the domain matches exactly.
    StaticRedirect {
        original: String,
        substitution: String,
    },
    /// Follow `<meta name="go-source">` / `go-import` tags.
    GoGet {
        #[serde(default)]
        mode: GoGetMode,
        #[serde(default)]
        domains: Vec<String>,
    },
    /// Shape the download path from a per-domain template. Without
    /// `templates` only the built-in hosting conventions are known.
    Path {
        #[serde(default)]
        templates: Option<BTreeMap<String, String>>,
    },
    /// Add headers to requests for `domain`.
    Headers {
        domain: String,
        headers: BTreeMap<String, String>,
    },
    /// Fetch `domain` over a different scheme.
    Transport { domain: String, transport: String },
}

/// Open module proxy used for public modules.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenProxyConfig {
    #[serde(default = "default_open_proxy_enabled")]
    pub enabled: bool,
    #[serde(default = "default_open_proxy_url")]
    pub url: String,
}

fn default_open_proxy_enabled() -> bool {
    true
}

fn default_open_proxy_url() -> String {
    "https://proxy.golang.org".to_string()
}

impl Default for OpenProxyConfig {
    fn default() -> Self {
        Self {
            enabled: default_open_proxy_enabled(),
            url: default_open_proxy_url(),
        }
    }
}

/// Upstream fetching configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Timeout in seconds for every upstream request, including discovery.
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_transforms")]
    pub transforms: Vec<TransformConfig>,
    #[serde(default)]
    pub open_proxy: OpenProxyConfig,
}

fn default_upstream_timeout_secs() -> u64 {
    60
}

fn default_transforms() -> Vec<TransformConfig> {
    vec![
        TransformConfig::GoGet {
            mode: GoGetMode::Selective,
            domains: Vec::new(),
        },
        TransformConfig::Path { templates: None },
    ]
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_upstream_timeout_secs(),
            transforms: default_transforms(),
            open_proxy: OpenProxyConfig::default(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("upstream.timeout_secs cannot be 0".to_string());
        }
        for transform in &self.transforms {
            if let TransformConfig::Transport { domain, transport } = transform
                && transport != "http"
                && transport != "https"
            {
                return Err(format!(
                    "unsupported transport {transport:?} configured for {domain}"
                ));
            }
        }
        Ok(())
    }
}

/// Reconciliation worker configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_enabled")]
    pub enabled: bool,
    /// Seconds between reconciliation cycles.
    #[serde(default = "default_worker_interval_secs")]
    pub interval_secs: u64,
}

fn default_worker_enabled() -> bool {
    true
}

fn default_worker_interval_secs() -> u64 {
    30
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_worker_enabled(),
            interval_secs: default_worker_interval_secs(),
        }
    }
}

impl WorkerConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        // tokio::time::interval panics on a zero period
        if self.enabled && self.interval_secs == 0 {
            return Err("worker.interval_secs cannot be 0. Use a value >= 1 second.".to_string());
        }
        Ok(())
    }
}

/// Complete proxy configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_index_database")]
    pub index: DatabaseConfig,
    #[serde(default)]
    pub registry: RegistryClientConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

fn default_index_database() -> DatabaseConfig {
    DatabaseConfig::sqlite("./data/index.db")
}

impl ProxyConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage and a SQLite index under
    /// `./data`, with the background worker disabled.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            index: default_index_database(),
            registry: RegistryClientConfig::default(),
            upstream: UpstreamConfig::default(),
            worker: WorkerConfig {
                enabled: false,
                ..Default::default()
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.index.validate()?;
        self.registry.validate()?;
        self.upstream.validate()?;
        self.worker.validate()
    }
}

/// Complete registry configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_server")]
    pub server: ServerConfig,
    #[serde(default = "default_catalog_database")]
    pub catalog: DatabaseConfig,
}

fn default_registry_server() -> ServerConfig {
    ServerConfig {
        bind: default_registry_bind(),
        ..Default::default()
    }
}

fn default_catalog_database() -> DatabaseConfig {
    DatabaseConfig::sqlite("./data/registry.db")
}

impl RegistryConfig {
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            server: default_registry_server(),
            catalog: default_catalog_database(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.catalog.validate()
    }
}
