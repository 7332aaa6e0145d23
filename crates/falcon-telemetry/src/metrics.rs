//! Prometheus metrics.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `falcon_dispatch_total` | Counter | `outcome`, `method` | Requests dispatched |
//! | `falcon_dispatch_duration_seconds` | Histogram | `outcome` | Dispatch latency |
//! | `falcon_intercepts_total` | Counter | `stage` | Requests halted by middleware |
//! | `falcon_in_flight_requests` | Gauge | - | Requests being dispatched |
//!
//! The recording functions are cheap no-ops until [`init_metrics`] installs a
//! recorder.

use std::fmt;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// Whether a recorder is installed.
    pub enabled: bool,

    /// Address of the scrape endpoint, e.g. `0.0.0.0:9090`. Without one the
    /// recorder is installed and [`render_metrics`] serves the text format.
    pub addr: Option<String>,
}

/// How a request left the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
    /// A route handler ran
    Matched,
    /// No route matched the path
    NotFound,
    /// A route matched the path but not the method
    NotAllowed,
    /// Middleware halted the request
    Intercepted,
    /// The handler or a middleware panicked
    Panicked,
}

impl DispatchOutcome {
    /// Returns the label value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NotFound => "not_found",
            Self::NotAllowed => "not_allowed",
            Self::Intercepted => "intercepted",
            Self::Panicked => "panicked",
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs the Prometheus recorder.
///
/// With an address, the exporter also serves `/metrics` on it; this must run
/// inside a Tokio runtime.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new();
    match &config.addr {
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

/// Renders the text exposition format, if a local recorder is installed.
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!("falcon_dispatch_total", "Requests dispatched, by outcome and method");
    describe_histogram!(
        "falcon_dispatch_duration_seconds",
        "Time spent in the dispatcher in seconds"
    );
    describe_counter!("falcon_intercepts_total", "Requests halted by middleware, by stage");
    describe_gauge!("falcon_in_flight_requests", "Requests currently being dispatched");
}

/// Records one dispatched request.
pub fn record_dispatch(outcome: DispatchOutcome, method: &str, duration: Duration) {
    counter!(
        "falcon_dispatch_total",
        "outcome" => outcome.as_str(),
        "method" => method.to_string()
    )
    .increment(1);

    histogram!("falcon_dispatch_duration_seconds", "outcome" => outcome.as_str())
        .record(duration.as_secs_f64());
}

/// Records a middleware intercept at `stage` (`global`, `before`, `after`).
pub fn record_intercept(stage: &'static str) {
    counter!("falcon_intercepts_total", "stage" => stage).increment(1);
}

/// Tracks one in-flight request for as long as it lives.
#[derive(Debug)]
pub struct InFlightGuard(());

impl InFlightGuard {
    /// Increments the in-flight gauge.
    pub fn new() -> Self {
        gauge!("falcon_in_flight_requests").increment(1.0);
        Self(())
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("falcon_in_flight_requests").decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_disabled() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: Some("not-an-address".to_string()),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(DispatchOutcome::NotAllowed.as_str(), "not_allowed");
        assert_eq!(DispatchOutcome::Panicked.to_string(), "panicked");
    }

    #[test]
    fn test_recording_without_recorder() {
        record_dispatch(DispatchOutcome::Matched, "GET", Duration::from_millis(3));
        record_intercept("global");
        let guard = InFlightGuard::new();
        drop(guard);
    }
}
