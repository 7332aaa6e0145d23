//! Configuration sections.
//!
//! Every section rejects unknown fields and fills omitted ones with defaults.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// HTTP listener settings.
///
/// # Example
///
/// ```
/// use falcon_config::ServerSettings;
///
/// let server = ServerSettings::default();
/// assert_eq!(server.addr(), "0.0.0.0:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Time allowed to receive a request body, in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest request body accepted, in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Whether HTTP/1.1 keep-alive is enabled.
    #[serde(default = "default_true")]
    pub keep_alive: bool,
}

impl ServerSettings {
    /// Returns `host:port`.
    pub fn addr(&self) -> String {
        join_host_port(&self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_size: default_max_body_size(),
            keep_alive: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

/// HTTPS listener settings.
///
/// When enabled, a second listener serves the same routes over TLS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TlsSettings {
    /// Whether the HTTPS listener runs.
    #[serde(default)]
    pub enabled: bool,

    /// PEM certificate chain.
    #[serde(default)]
    pub cert_path: Option<PathBuf>,

    /// PEM private key.
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// Interface to bind; the server host when unset.
    #[serde(default)]
    pub host: Option<String>,

    /// HTTPS port.
    #[serde(default = "default_tls_port")]
    pub port: u16,
}

impl TlsSettings {
    /// Returns `host:port`, falling back to `server_host`.
    pub fn addr(&self, server_host: &str) -> String {
        join_host_port(self.host.as_deref().unwrap_or(server_host), self.port)
    }
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_path: None,
            key_path: None,
            host: None,
            port: default_tls_port(),
        }
    }
}

fn default_tls_port() -> u16 {
    443
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable.
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Pretty => f.write_str("pretty"),
        }
    }
}

impl From<LogFormat> for falcon_telemetry::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Whether a log subscriber is installed.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `falcon_router=debug,info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Prometheus metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MetricsSettings {
    /// Whether a recorder is installed.
    #[serde(default)]
    pub enabled: bool,

    /// Scrape endpoint address.
    #[serde(default)]
    pub addr: Option<String>,
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
