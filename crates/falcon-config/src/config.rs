//! Top-level configuration.

use std::net::SocketAddr;

use falcon_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, LoggingSettings, MetricsSettings, ServerSettings, TlsSettings};

/// Complete Falcon server configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and the
/// environment.
///
/// # Example
///
/// ```
/// use falcon_config::FalconConfig;
///
/// let config = FalconConfig::default();
/// assert_eq!(config.server.port, 8080);
/// assert!(!config.tls.enabled);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct FalconConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerSettings,

    /// HTTPS listener.
    #[serde(default)]
    pub tls: TlsSettings,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics.
    #[serde(default)]
    pub metrics: MetricsSettings,
}

impl FalconConfig {
    /// Creates a configuration builder.
    pub fn builder() -> FalconConfigBuilder {
        FalconConfigBuilder::default()
    }

    /// Checks cross-field constraints.
    ///
    /// - ports are non-zero
    /// - the HTTP and HTTPS listeners use different addresses
    /// - TLS has both a certificate and a key when enabled
    /// - the metrics address parses when metrics are enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid_value("server.port", "must be non-zero"));
        }
        if self.server.host.is_empty() {
            return Err(ConfigError::invalid_value("server.host", "must not be empty"));
        }

        if self.tls.enabled {
            if self.tls.port == 0 {
                return Err(ConfigError::invalid_value("tls.port", "must be non-zero"));
            }
            if self.tls.cert_path.is_none() {
                return Err(ConfigError::missing_field("tls.cert_path"));
            }
            if self.tls.key_path.is_none() {
                return Err(ConfigError::missing_field("tls.key_path"));
            }
            if self.tls.addr(&self.server.host) == self.server.addr() {
                return Err(ConfigError::invalid_value(
                    "tls.port",
                    "HTTP and HTTPS listeners cannot share an address",
                ));
            }
        }

        if self.metrics.enabled {
            if let Some(addr) = &self.metrics.addr {
                if addr.parse::<SocketAddr>().is_err() {
                    return Err(ConfigError::invalid_value(
                        "metrics.addr",
                        format!("invalid socket address: {addr}"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Debug-level, human-readable logging.
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config
    }

    /// JSON logging at `info`, metrics on.
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.metrics.enabled = true;
        config
    }

    /// Derives the telemetry settings.
    pub fn telemetry(&self) -> TelemetryConfig {
        let base = match self.logging.format {
            LogFormat::Pretty => LogConfig::development(),
            LogFormat::Json => LogConfig::production(),
        };
        TelemetryConfig {
            logging: LogConfig {
                enabled: self.logging.enabled,
                level: self.logging.level.clone(),
                format: self.logging.format.into(),
                ..base
            },
            metrics: MetricsConfig {
                enabled: self.metrics.enabled,
                addr: self.metrics.addr.clone(),
            },
        }
    }
}

/// Builder for [`FalconConfig`].
#[derive(Debug, Default)]
pub struct FalconConfigBuilder {
    server: Option<ServerSettings>,
    tls: Option<TlsSettings>,
    logging: Option<LoggingSettings>,
    metrics: Option<MetricsSettings>,
}

impl FalconConfigBuilder {
    /// Sets the server section.
    pub fn server(mut self, server: ServerSettings) -> Self {
        self.server = Some(server);
        self
    }

    /// Sets the TLS section.
    pub fn tls(mut self, tls: TlsSettings) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Sets the logging section.
    pub fn logging(mut self, logging: LoggingSettings) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Sets the metrics section.
    pub fn metrics(mut self, metrics: MetricsSettings) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the configuration; unset sections use defaults.
    pub fn build(self) -> FalconConfig {
        FalconConfig {
            server: self.server.unwrap_or_default(),
            tls: self.tls.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
        }
    }

    /// Builds and validates the configuration.
    pub fn build_validated(self) -> Result<FalconConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
