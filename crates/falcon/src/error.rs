//! Top-level error type.

use falcon_config::ConfigError;
use falcon_core::FalconError;
use falcon_router::RouteError;
use falcon_server::ServerError;
use falcon_telemetry::TelemetryError;
use thiserror::Error;

/// Any failure that stops [`run`](crate::run).
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The route table could not be built.
    #[error(transparent)]
    Route(#[from] FalconError),

    /// A listener failed.
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl From<RouteError> for Error {
    fn from(err: RouteError) -> Self {
        Self::Route(FalconError::from(err))
    }
}

/// Result alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
