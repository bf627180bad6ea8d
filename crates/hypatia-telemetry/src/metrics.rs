//! Request metrics.
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed. [`init_metrics`] installs the Prometheus recorder.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hypatia_requests_total` | Counter | `resource`, `operation`, `status` | Handled requests |
//! | `hypatia_request_duration_seconds` | Histogram | `resource`, `operation` | Handling latency |
//! | `hypatia_in_flight_requests` | Gauge | - | Requests being handled |
//! | `hypatia_panics_total` | Counter | `resource` | Handler panics recovered |
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use hypatia_telemetry::metrics::record_request;
//!
//! record_request("users", "users.find_one", 200, Duration::from_millis(4));
//! ```

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;

use crate::error::TelemetryError;
use crate::TelemetryResult;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address for a standalone scrape listener (e.g. `"0.0.0.0:9090"`).
    ///
    /// Without one, metrics are only available through [`render_metrics`].
    pub listen_addr: Option<String>,

    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: None,
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder.
///
/// With a `listen_addr` the exporter serves scrapes itself and must be
/// called from within a tokio runtime; otherwise the recorder is installed
/// and rendered on demand through [`render_metrics`].
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("hypatia_request_duration_seconds".to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    match &config.listen_addr {
        Some(addr) => {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| TelemetryError::InvalidAddress(format!("{addr}: {e}")))?;
            builder
                .with_http_listener(addr)
                .install()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        }
        None => {
            let handle = builder
                .install_recorder()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
            let _ = METRICS_HANDLE.set(handle);
        }
    }

    describe_metrics();
    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` unless [`init_metrics`] installed an on-demand recorder.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!("hypatia_requests_total", "Total number of requests handled");
    describe_histogram!(
        "hypatia_request_duration_seconds",
        "Request handling time in seconds"
    );
    describe_gauge!(
        "hypatia_in_flight_requests",
        "Number of requests currently being handled"
    );
    describe_counter!(
        "hypatia_panics_total",
        "Handler panics recovered at the dispatch boundary"
    );
}

/// Records a handled request.
pub fn record_request(resource: &str, operation: &str, status_code: u16, duration: Duration) {
    counter!(
        "hypatia_requests_total",
        "resource" => resource.to_string(),
        "operation" => operation.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "hypatia_request_duration_seconds",
        "resource" => resource.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a recovered handler panic.
pub fn record_panic(resource: &str) {
    counter!("hypatia_panics_total", "resource" => resource.to_string()).increment(1);
}

/// Keeps the in-flight gauge raised for its lifetime.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("hypatia_in_flight_requests").increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("hypatia_in_flight_requests").decrement(1.0);
    }
}
