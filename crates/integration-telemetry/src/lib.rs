//! # Integration Telemetry
//!
//! Logging and metrics for the integration core.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` registry with an `EnvFilter` and a pretty
//!   or JSON `fmt` layer
//! - **Metrics**: Prometheus counters, gauges and histograms in a global
//!   registry, encoded on demand
//!
//! ## Usage
//!
//! ```rust,ignore
//! use integration_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `integration-core` | Service name in the startup log |
//! | `IC_LOG_LEVEL` | `info` | Log level filter |
//! | `IC_JSON_LOGS` | `false` | JSON log output |
//! | `IC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, ALERTS_RAISED,
    ALERTS_RESOLVED, BUS_DEAD_LETTERS, BUS_EVENTS_DELIVERED, BUS_EVENTS_EXPIRED,
    BUS_EVENTS_PUBLISHED, BUS_HANDLER_FAILURES, BUS_QUEUE_DEPTH, BUS_RETRIES, HEALTH_CHECKS,
    HEALTH_CHECK_DURATION, LB_SELECTIONS,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Initialize metrics first so early log lines can't race registration
    let metrics_handle = register_metrics()?;

    let tracing_guard = tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        _tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = self._tracing.service_name(), "Shutting down telemetry...");
    }
}

/// Convenience macro for creating a span with component context.
#[macro_export]
macro_rules! component_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "integration-core");
    }
}
