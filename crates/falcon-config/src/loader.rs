//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, FalconConfig, LogFormat};

/// Default prefix of environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "FALCON";

/// Loads a [`FalconConfig`] from layered sources.
///
/// Later layers override earlier ones field by field:
/// 1. Defaults (or a preset)
/// 2. Configuration files and strings, in the order added
/// 3. Environment variables `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use falcon_config::ConfigLoader;
///
/// # fn main() -> Result<(), falcon_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("falcon.toml")?
///     .with_dotenv()?
///     .with_env_prefix("FALCON")
///     .load()?;
/// println!("listening on {}", config.server.addr());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: Value,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from defaults.
    pub fn new() -> Self {
        Self::from_config(&FalconConfig::default())
    }

    fn from_config(config: &FalconConfig) -> Self {
        Self {
            config: serde_json::to_value(config).unwrap_or(Value::Null),
            env_prefix: None,
        }
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(self) -> Self {
        Self {
            env_prefix: self.env_prefix,
            ..Self::from_config(&FalconConfig::development())
        }
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(self) -> Self {
        Self {
            env_prefix: self.env_prefix,
            ..Self::from_config(&FalconConfig::production())
        }
    }

    /// Merges a `.toml` or `.json` file.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.with_string(&content, &format)
    }

    /// Merges a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges configuration text in `format` (`toml` or `json`).
    ///
    /// ```
    /// use falcon_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nport = 3000", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.server.port, 3000);
    /// assert_eq!(config.server.host, "0.0.0.0");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        // Each layer must deserialize on its own: unknown fields are errors.
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => {
                let raw: toml::Value = toml::from_str(content)?;
                let _: FalconConfig = raw.clone().try_into()?;
                serde_json::to_value(raw)?
            }
            "json" => {
                let raw: Value = serde_json::from_str(content)?;
                let _: FalconConfig = serde_json::from_value(raw.clone())?;
                raw
            }
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        merge(&mut self.config, layer);
        Ok(self)
    }

    /// Loads `.env` from the working directory, if present.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::DotenvError(e.to_string())),
        }
    }

    /// Loads environment variables from a specific file.
    pub fn with_dotenv_path<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref()).map_err(|e| ConfigError::DotenvError(e.to_string()))?;
        Ok(self)
    }

    /// Enables environment overrides with `prefix`.
    ///
    /// With prefix `FALCON`, `FALCON__SERVER__PORT=9000` sets `server.port`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies explicit `PREFIX__SECTION__KEY` pairs.
    pub fn with_env_vars<I, K, V>(self, prefix: &str, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let prefix = prefix.to_uppercase();
        let marker = format!("{prefix}__");
        let mut config = self.typed()?;
        for (key, value) in vars {
            let key = key.as_ref();
            if key.starts_with(&marker) {
                apply_env_var(&mut config, key, value.as_ref(), &prefix)?;
            }
        }
        Ok(Self {
            env_prefix: self.env_prefix,
            ..Self::from_config(&config)
        })
    }

    /// Applies environment overrides and validates.
    pub fn load(self) -> Result<FalconConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides without validating.
    pub fn load_unvalidated(mut self) -> Result<FalconConfig, ConfigError> {
        match self.env_prefix.take() {
            Some(prefix) => {
                let vars = env::vars_os()
                    .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
                self.with_env_vars(&prefix, vars)?.typed()
            }
            None => self.typed(),
        }
    }

    fn typed(&self) -> Result<FalconConfig, ConfigError> {
        Ok(serde_json::from_value(self.config.clone())?)
    }
}

/// Deep-merges `layer` into `base`; tables merge, everything else replaces.
fn merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn apply_env_var(
    config: &mut FalconConfig,
    key: &str,
    value: &str,
    prefix: &str,
) -> Result<(), ConfigError> {
    let rest = key
        .strip_prefix(prefix)
        .and_then(|k| k.strip_prefix("__"))
        .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;
    let parts: Vec<&str> = rest.split("__").collect();

    let integer =
        |v: &str| ConfigError::env_parse_error(key, format!("expected integer, got '{v}'"));
    let boolean = || ConfigError::env_parse_error(key, "expected boolean");
    let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

    match parts.as_slice() {
        ["SERVER", "HOST"] => config.server.host = value.to_string(),
        ["SERVER", "PORT"] => config.server.port = value.parse().map_err(|_| integer(value))?,
        ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
            config.server.shutdown_timeout_secs = value.parse().map_err(|_| integer(value))?;
        }
        ["SERVER", "REQUEST_TIMEOUT_MS"] => {
            config.server.request_timeout_ms = value.parse().map_err(|_| integer(value))?;
        }
        ["SERVER", "MAX_BODY_SIZE"] => {
            config.server.max_body_size = value.parse().map_err(|_| integer(value))?;
        }
        ["SERVER", "KEEP_ALIVE"] => {
            config.server.keep_alive = parse_bool(value).ok_or_else(boolean)?;
        }

        ["TLS", "ENABLED"] => config.tls.enabled = parse_bool(value).ok_or_else(boolean)?,
        ["TLS", "CERT_PATH"] => config.tls.cert_path = optional(value).map(Into::into),
        ["TLS", "KEY_PATH"] => config.tls.key_path = optional(value).map(Into::into),
        ["TLS", "HOST"] => config.tls.host = optional(value),
        ["TLS", "PORT"] => config.tls.port = value.parse().map_err(|_| integer(value))?,

        ["LOGGING", "ENABLED"] => config.logging.enabled = parse_bool(value).ok_or_else(boolean)?,
        ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
        ["LOGGING", "FORMAT"] => {
            config.logging.format = match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => return Err(ConfigError::env_parse_error(key, "expected 'json' or 'pretty'")),
            };
        }

        ["METRICS", "ENABLED"] => config.metrics.enabled = parse_bool(value).ok_or_else(boolean)?,
        ["METRICS", "ADDR"] => config.metrics.addr = optional(value),

        _ => {}
    }

    Ok(())
}

/// Parses `true/false`, `1/0`, `yes/no` and `on/off`.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
