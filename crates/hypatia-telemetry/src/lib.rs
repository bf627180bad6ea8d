//! Observability for Hypatia services.
//!
//! - **Logging**: structured output via `tracing-subscriber`, see [`logging`]
//! - **Metrics**: request counters and latency histograms via the `metrics`
//!   facade with a Prometheus recorder, see [`metrics`]
//!
//! The dispatcher in `hypatia-server` records through this crate
//! unconditionally; nothing is emitted until the embedding application calls
//! [`init_telemetry`] (or the individual `init_*` functions).
//!
//! # Example
//!
//! ```rust,ignore
//! use hypatia_telemetry::{init_telemetry, LogConfig, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig {
//!     logging: LogConfig::development(),
//!     ..TelemetryConfig::default()
//! })?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, record_panic, record_request, InFlightGuard, MetricsConfig};

#[doc(hidden)]
pub use tracing as __tracing;

use serde::Deserialize;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Configuration for all telemetry subsystems.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns the first subsystem error.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json() {
        let config: TelemetryConfig = serde_json::from_str(
            r#"{"logging":{"enabled":false},"metrics":{"enabled":false}}"#,
        )
        .unwrap();
        assert!(!config.logging.enabled);
        assert!(!config.metrics.enabled);
        assert!(init_telemetry(&config).is_ok());
    }
}
