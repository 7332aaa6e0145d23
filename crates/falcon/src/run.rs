//! Application runner.

use std::time::Duration;

use falcon_config::FalconConfig;
use falcon_core::App;
use falcon_server::{Server, ServerConfig, ShutdownSignal, TlsConfig};

use crate::Result;

/// Derives listener settings from a validated configuration.
///
/// The HTTPS listener is added only when `tls.enabled` is set.
pub fn server_config(config: &FalconConfig) -> Result<ServerConfig> {
    config.validate()?;

    let mut builder = ServerConfig::builder()
        .http_addr(config.server.addr())
        .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
        .request_timeout(Duration::from_millis(config.server.request_timeout_ms))
        .max_body_size(config.server.max_body_size)
        .keep_alive(config.server.keep_alive);

    if config.tls.enabled {
        if let (Some(cert), Some(key)) = (&config.tls.cert_path, &config.tls.key_path) {
            builder = builder.tls(TlsConfig::new(
                config.tls.addr(&config.server.host),
                cert,
                key,
            ));
        }
    }

    Ok(builder.build())
}

/// Runs `app` until SIGINT or SIGTERM.
///
/// Installs logging and metrics from `config`, builds the route table and
/// serves it on the HTTP listener plus the HTTPS listener when enabled.
/// A route conflict found while building is returned before anything binds.
///
/// ```rust,no_run
/// use falcon::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), falcon::Error> {
///     let mut app = App::new();
///     app.get("/users/:id", |ctx| {
///         let id = ctx.param("id").unwrap_or_default().to_string();
///         ctx.write_str(&id);
///     })?;
///
///     falcon::run(app, FalconConfig::development()).await
/// }
/// ```
pub async fn run(app: App, config: FalconConfig) -> Result<()> {
    run_with_shutdown(app, config, ShutdownSignal::with_os_signals()).await
}

/// Like [`run`], stopping when `shutdown` is triggered.
pub async fn run_with_shutdown(
    app: App,
    config: FalconConfig,
    shutdown: ShutdownSignal,
) -> Result<()> {
    let server_config = server_config(&config)?;
    falcon_telemetry::init_telemetry(&config.telemetry())?;

    let dispatcher = match app.build() {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            tracing::error!(error = %e, "invalid route configuration");
            return Err(e.into());
        }
    };
    dispatcher.log_routes();

    tracing::info!(
        http = server_config.http_addr(),
        https = server_config.tls().map(TlsConfig::addr),
        "starting"
    );
    Server::new(server_config, dispatcher)
        .run_with_shutdown(shutdown)
        .await?;
    tracing::info!("stopped");
    Ok(())
}
