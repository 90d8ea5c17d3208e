//! Prometheus metrics for the proxy.
//!
//! The `/metrics` endpoint is unauthenticated. It exposes only aggregate
//! counters; restrict it at the network level if that matters.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Registry scraped by `/metrics`.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static RECONCILE_CYCLES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "modprox_reconcile_cycles_total",
        "Total number of reconciliation cycles run",
    )
    .expect("metric creation failed")
});

pub static RECONCILE_CYCLE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "modprox_reconcile_cycle_failures_total",
        "Cycles abandoned because the index or registry could not be read",
    )
    .expect("metric creation failed")
});

pub static MODULES_DOWNLOADED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "modprox_modules_downloaded_total",
            "Module archives downloaded, by origin",
        ),
        &["origin"],
    )
    .expect("metric creation failed")
});

pub static MODULES_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "modprox_modules_failed_total",
        "Modules that failed to download or index",
    )
    .expect("metric creation failed")
});

pub static SERIAL_IDS_UPDATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "modprox_serial_ids_updated_total",
        "Indexed modules whose registry serial ID was corrected in place",
    )
    .expect("metric creation failed")
});

pub static RECONCILE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "modprox_reconcile_duration_seconds",
            "Time taken by one reconciliation cycle",
        )
        .buckets(vec![0.05, 0.25, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register the reconciler metrics with [`REGISTRY`]. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        let collectors: [Box<dyn Collector>; 6] = [
            Box::new(RECONCILE_CYCLES.clone()),
            Box::new(RECONCILE_CYCLE_FAILURES.clone()),
            Box::new(MODULES_DOWNLOADED.clone()),
            Box::new(MODULES_FAILED.clone()),
            Box::new(SERIAL_IDS_UPDATED.clone()),
            Box::new(RECONCILE_DURATION.clone()),
        ];
        for collector in collectors {
            REGISTRY
                .register(collector)
                .expect("metric registration failed");
        }
    });
}

/// GET /metrics in the Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("metrics encoding failed: {e}").into_bytes(),
        ),
    }
}

/// Where a downloaded archive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    OpenProxy,
    Upstream,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::OpenProxy => "open_proxy",
            Origin::Upstream => "upstream",
        }
    }
}

pub fn record_download(origin: Origin) {
    MODULES_DOWNLOADED.with_label_values(&[origin.as_str()]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_record_download_by_origin() {
        let before = MODULES_DOWNLOADED.with_label_values(&["upstream"]).get();
        record_download(Origin::Upstream);
        assert_eq!(
            MODULES_DOWNLOADED.with_label_values(&["upstream"]).get(),
            before + 1
        );
    }
}
