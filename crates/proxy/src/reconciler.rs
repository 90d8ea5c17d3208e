//! The reconciliation worker.
//!
//! Each cycle asks the registry which modules this proxy is missing, then
//! downloads, normalizes, stores and indexes them one at a time. A failure
//! on one module is recorded as a [`Problem`] and never stops the cycle; the
//! module is simply needed again next time.

use crate::metrics::{self, Origin};
use crate::problems::{Problem, ProblemTracker};
use crate::registry::{self, RegistryClient, RegistryClientError};
use modprox_core::{Blob, ModuleCoordinate, SerialCoordinate};
use modprox_index::{Index, IndexError, ModuleAddition, ModuleRepo};
use modprox_storage::{StorageError, ZipStore};
use modprox_upstream::{ProxyClient, Resolver, UpstreamClient, UpstreamError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Why a single module could not be reconciled.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Core(#[from] modprox_core::Error),

    #[error(transparent)]
    Registry(#[from] RegistryClientError),

    #[error("normalizer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What happened to one needed module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Already indexed under the same serial ID.
    Skipped,
    /// Already indexed; only the serial ID changed.
    Updated,
    Downloaded(Origin),
}

/// Tally of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub needed: usize,
    pub skipped: usize,
    pub updated: usize,
    pub downloaded: usize,
    pub failed: usize,
    /// Set when the cycle could not even compute what was needed.
    pub aborted: bool,
}

pub struct Reconciler {
    index: Arc<dyn Index>,
    zips: Arc<dyn ZipStore>,
    registry: Arc<dyn RegistryClient>,
    resolver: Arc<Resolver>,
    upstream: Arc<dyn UpstreamClient>,
    open_proxy: Option<Arc<dyn ProxyClient>>,
    problems: Arc<ProblemTracker>,
}

impl Reconciler {
    pub fn new(
        index: Arc<dyn Index>,
        zips: Arc<dyn ZipStore>,
        registry: Arc<dyn RegistryClient>,
        resolver: Arc<Resolver>,
        upstream: Arc<dyn UpstreamClient>,
        problems: Arc<ProblemTracker>,
    ) -> Self {
        Self {
            index,
            zips,
            registry,
            resolver,
            upstream,
            open_proxy: None,
            problems,
        }
    }

    /// Download public modules from an open proxy instead of their origin.
    /// Without one, every module is fetched upstream.
    pub fn with_open_proxy(mut self, client: Arc<dyn ProxyClient>) -> Self {
        self.open_proxy = Some(client);
        self
    }

    /// Run cycles every `interval` until `cancel` fires. Cycles never
    /// overlap; ticks missed while a cycle runs are dropped.
    pub fn spawn(self: Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = interval.as_secs(), "reconciliation worker started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                }
            }
            info!("reconciliation worker stopped");
        })
    }

    /// Run one cycle. Never fails; problems are logged and tracked.
    pub async fn run_once(&self) -> CycleReport {
        let started = Instant::now();
        metrics::RECONCILE_CYCLES.inc();
        let mut report = CycleReport::default();

        let needed = match self.needed().await {
            Ok(needed) => needed,
            Err(e) => {
                error!(error = %e, "could not determine needed modules");
                metrics::RECONCILE_CYCLE_FAILURES.inc();
                report.aborted = true;
                return report;
            }
        };
        report.needed = needed.len();
        if !needed.is_empty() {
            info!(count = needed.len(), "reconciling needed modules");
        }

        for serial in &needed {
            match self.reconcile(serial).await {
                Ok(Outcome::Skipped) => report.skipped += 1,
                Ok(Outcome::Updated) => report.updated += 1,
                Ok(Outcome::Downloaded(_)) => report.downloaded += 1,
                Err(e) => {
                    report.failed += 1;
                    metrics::MODULES_FAILED.inc();
                    warn!(
                        source = %serial.module.source,
                        version = %serial.module.version,
                        error = %e,
                        "failed to reconcile module"
                    );
                    self.problems
                        .set(Problem::new(serial.module.clone(), e.to_string()));
                }
            }
        }

        metrics::RECONCILE_DURATION.observe(started.elapsed().as_secs_f64());
        debug!(?report, "reconciliation cycle finished");
        report
    }

    async fn needed(&self) -> Result<Vec<SerialCoordinate>, ReconcileError> {
        let ids = self.index.ids().await?;
        Ok(registry::needed(self.registry.as_ref(), &ids).await?)
    }

    /// Bring one module into the index.
    #[instrument(skip(self), fields(module = %serial.module, id = serial.serial_id))]
    pub async fn reconcile(&self, serial: &SerialCoordinate) -> Result<Outcome, ReconcileError> {
        if let Some(existing) = self.index.contains(&serial.module).await? {
            if existing == serial.serial_id {
                return Ok(Outcome::Skipped);
            }
            // Archive content is immutable; only the registry's numbering moved.
            self.index.update_id(serial).await?;
            metrics::SERIAL_IDS_UPDATED.inc();
            debug!(old_id = existing, "serial id updated in place");
            return Ok(Outcome::Updated);
        }

        let (blob, origin) = self.download(&serial.module).await?;
        let mod_file = blob
            .mod_file()?
            .unwrap_or_else(|| format!("module {}\n", serial.module.source));

        self.zips.put_zip(&serial.module, blob).await?;
        self.index
            .put(&ModuleAddition {
                coordinate: serial.module.clone(),
                serial_id: serial.serial_id,
                mod_file,
            })
            .await?;

        metrics::record_download(origin);
        info!(origin = origin.as_str(), "module indexed");
        Ok(Outcome::Downloaded(origin))
    }

    /// A normalized archive for `module`, from the open proxy when policy
    /// allows it and from the module's origin otherwise.
    async fn download(&self, module: &ModuleCoordinate) -> Result<(Blob, Origin), ReconcileError> {
        if let Some(proxy) = &self.open_proxy
            && self.resolver.use_proxy(module).await?
        {
            let blob = proxy.get(module).await?;
            return Ok((blob, Origin::OpenProxy));
        }

        let request = self.resolver.resolve(module).await?;
        let raw = self.upstream.get(&request).await?;
        let coordinate = module.clone();
        let blob =
            tokio::task::spawn_blocking(move || modprox_core::rewrite(&coordinate, &raw)).await??;
        Ok((blob, Origin::Upstream))
    }
}
