//! Structured logging for Hypatia.
//!
//! Builds a `tracing-subscriber` stack from a [`LogConfig`]: JSON lines for
//! production, pretty output for development, filtered through an
//! [`EnvFilter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use hypatia_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//!
//! tracing::info!(resource = "users", "Resource registered");
//! ```

use serde::Deserialize;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. `"info"`, `"hypatia_server=debug,info"`).
    pub level: String,

    /// Whether to output JSON lines.
    pub json_format: bool,

    /// Whether to emit span open/close events.
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include the target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Human-readable output at `debug`.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }

    /// Disabled logging, for tests that install their own subscriber.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::production()
        }
    }
}

/// Installs the global log subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the level is not a valid filter
/// directive or a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_target(config.include_target);

    let result = if config.json_format {
        tracing_subscriber::registry()
            .with(layer.json().with_filter(filter))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(layer.pretty().with_filter(filter))
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

/// Standard log field names.
///
/// `tracing` macros take field names as tokens, so these constants document
/// the vocabulary rather than feed the macros directly.
pub mod fields {
    /// Request id.
    pub const REQUEST_ID: &str = "request_id";

    /// Derived route operation, e.g. `users.find_one`.
    pub const OPERATION_ID: &str = "operation_id";

    /// Resource type name.
    pub const RESOURCE: &str = "resource";

    /// HTTP method.
    pub const HTTP_METHOD: &str = "http.method";

    /// Request path.
    pub const HTTP_PATH: &str = "http.path";

    /// Response status code.
    pub const HTTP_STATUS: &str = "http.status_code";

    /// Handling time in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";

    /// Error message.
    pub const ERROR: &str = "error";
}

/// Logs that a request was received.
#[macro_export]
macro_rules! log_request_start {
    ($request_id:expr, $method:expr, $path:expr) => {
        $crate::__tracing::debug!(
            request_id = %$request_id,
            http.method = %$method,
            http.path = %$path,
            "Request started"
        );
    };
}

/// Logs a completed request.
#[macro_export]
macro_rules! log_request_complete {
    ($request_id:expr, $operation:expr, $status:expr, $duration_ms:expr) => {
        $crate::__tracing::info!(
            request_id = %$request_id,
            operation_id = %$operation,
            http.status_code = $status,
            duration_ms = $duration_ms,
            "Request completed"
        );
    };
}

/// Logs a request that failed with a server error.
#[macro_export]
macro_rules! log_request_error {
    ($request_id:expr, $operation:expr, $error:expr) => {
        $crate::__tracing::error!(
            request_id = %$request_id,
            operation_id = %$operation,
            error = %$error,
            "Request failed"
        );
    };
}
