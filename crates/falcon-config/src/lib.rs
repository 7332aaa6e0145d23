//! Typed, layered configuration for Falcon servers.
//!
//! - TOML and JSON files, strict about unknown fields
//! - Environment overrides (`FALCON__SECTION__KEY`) and `.env` files
//! - Field-by-field layering: defaults → files → environment
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! keep_alive = true
//!
//! [tls]
//! enabled = true
//! cert_path = "/etc/falcon/cert.pem"
//! key_path = "/etc/falcon/key.pem"
//! port = 443
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `FALCON__SERVER__PORT=9000`
//! - `FALCON__TLS__ENABLED=true`
//! - `FALCON__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{FalconConfig, FalconConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{LogFormat, LoggingSettings, MetricsSettings, ServerSettings, TlsSettings};
