//! Logging and metrics for Falcon.
//!
//! - **Logging**: a `tracing-subscriber` stack with an env filter and JSON
//!   or pretty output
//! - **Metrics**: Prometheus counters, histograms and gauges for dispatch
//!   outcomes via the `metrics` facade
//!
//! ```text
//!   falcon-router ─┐
//!   falcon-core   ─┼─► tracing ──► EnvFilter ──► fmt (json | pretty) ──► stdout
//!   falcon-server ─┘
//!                    metrics ──► Prometheus recorder ──► /metrics
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use falcon_telemetry::{init_telemetry, LogConfig, MetricsConfig, TelemetryConfig};
//!
//! let config = TelemetryConfig {
//!     logging: LogConfig::development(),
//!     metrics: MetricsConfig { enabled: true, addr: Some("127.0.0.1:9090".into()) },
//! };
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use self::error::TelemetryError;
pub use self::logging::{init_logging, LogConfig, LogFormat};
pub use self::metrics::{
    init_metrics, record_dispatch, record_intercept, render_metrics, DispatchOutcome,
    InFlightGuard, MetricsConfig,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Logging and metrics settings together.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Logging settings
    pub logging: LogConfig,
    /// Metrics settings
    pub metrics: MetricsConfig,
}

/// Installs logging, then metrics.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    tracing::debug!(
        log_format = %config.logging.format,
        metrics = config.metrics.enabled,
        "telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_telemetry_is_noop() {
        let config = TelemetryConfig {
            logging: LogConfig {
                enabled: false,
                ..LogConfig::default()
            },
            metrics: MetricsConfig::default(),
        };
        assert!(init_telemetry(&config).is_ok());
    }
}
