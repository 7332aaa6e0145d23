//! HTTP/1.1 listener.
//!
//! Each connection is served by hyper. A request body is collected in full,
//! wrapped in a [`Context`] and dispatched on Tokio's blocking pool, since
//! handlers are synchronous closures.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use falcon_core::{Context, ErrorDetail, ErrorEnvelope, FalconError, Response, SharedDispatcher};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::{tls, ServerConfig, ServerError};

/// Serves a dispatcher over HTTP and, when configured, HTTPS.
///
/// # Example
///
/// ```rust,no_run
/// use falcon_core::App;
/// use falcon_server::{Server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut app = App::new();
///     app.get("/ping", |ctx| {
///         ctx.write_str("pong");
///     })?;
///
///     let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
///     Server::new(config, app.build()?).run().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Server {
    config: ServerConfig,
    dispatcher: SharedDispatcher,
}

impl Server {
    /// Creates a server.
    pub fn new(config: ServerConfig, dispatcher: impl Into<SharedDispatcher>) -> Self {
        Self {
            config,
            dispatcher: dispatcher.into(),
        }
    }

    /// Listener configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Dispatcher handle; replacing its snapshot affects new requests only.
    pub fn dispatcher(&self) -> &SharedDispatcher {
        &self.dispatcher
    }

    /// Serves until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Serves until `shutdown` is triggered.
    ///
    /// Binds the HTTP listener and, when TLS is configured, the HTTPS
    /// listener. If either listener fails the other is shut down too and
    /// the first error is returned.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let http = bind(self.config.http_addr()).await?;

        let https = match self.config.tls() {
            Some(settings) => {
                let acceptor = tls::load_acceptor(settings)?;
                Some((bind(settings.addr()).await?, acceptor))
            }
            None => None,
        };

        let server = Arc::new(self);
        let http_task = stop_on_error(
            Arc::clone(&server).serve(http, None, shutdown.clone()),
            shutdown.clone(),
        );

        match https {
            None => http_task.await,
            Some((listener, acceptor)) => {
                let https_task = stop_on_error(
                    Arc::clone(&server).serve(listener, Some(acceptor), shutdown.clone()),
                    shutdown.clone(),
                );
                let (http_result, https_result) = tokio::join!(http_task, https_task);
                http_result.and(https_result)
            }
        }
    }

    /// Serves plain HTTP on an already bound listener until `shutdown`.
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        Arc::new(self).serve(listener, None, shutdown).await
    }

    /// Accept loop shared by both listeners.
    async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        acceptor: Option<TlsAcceptor>,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        let scheme = if acceptor.is_some() { "https" } else { "http" };
        tracing::info!(addr = %local_addr, scheme, "listening");

        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };

                    let server = Arc::clone(&self);
                    let token = tracker.acquire();
                    let shutdown = shutdown.clone();
                    let acceptor = acceptor.clone();

                    tokio::spawn(async move {
                        let result = match acceptor {
                            None => server.serve_connection(stream, remote_addr, false, shutdown).await,
                            Some(acceptor) => match acceptor.accept(stream).await {
                                Ok(stream) => server.serve_connection(stream, remote_addr, true, shutdown).await,
                                Err(e) => {
                                    tracing::debug!(remote = %remote_addr, error = %e, "TLS handshake failed");
                                    Ok(())
                                }
                            },
                        };
                        if let Err(e) = result {
                            tracing::debug!(remote = %remote_addr, error = %e, "connection error");
                        }
                        drop(token);
                    });
                }

                () = shutdown.recv() => {
                    tracing::info!(addr = %local_addr, scheme, "shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        let timeout = self.config.shutdown_timeout();
        tracing::info!(
            active = tracker.active_connections(),
            ?timeout,
            "draining connections"
        );

        tokio::select! {
            () = tracker.wait_for_idle() => {
                tracing::info!(addr = %local_addr, "all connections closed");
            }
            () = tokio::time::sleep(timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!(addr = %local_addr, scheme, "listener stopped");
        Ok(())
    }

    async fn serve_connection<I>(
        self: Arc<Self>,
        io: I,
        remote_addr: SocketAddr,
        secure: bool,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error>
    where
        I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let server = Arc::clone(&self);
        let service = service_fn(move |req: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req, remote_addr, secure).await) }
        });

        let conn = http1::Builder::new()
            .keep_alive(self.config.keep_alive())
            .serve_connection(TokioIo::new(io), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                // finish the in-flight request, then close
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(
        &self,
        req: http::Request<Incoming>,
        remote_addr: SocketAddr,
        secure: bool,
    ) -> Response {
        let (parts, body) = req.into_parts();
        let limit = self.config.max_body_size();

        if declared_length(&parts.headers).is_some_and(|len| len > limit) {
            tracing::warn!(remote = %remote_addr, limit, "declared request body exceeds limit");
            return payload_too_large();
        }

        let body = Limited::new(body, limit);
        let body = match tokio::time::timeout(self.config.request_timeout(), body.collect()).await
        {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(remote = %remote_addr, limit, "request body exceeds limit");
                return payload_too_large();
            }
            Ok(Err(e)) => {
                tracing::warn!(remote = %remote_addr, error = %e, "failed to read request body");
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "BODY_READ_ERROR",
                    "failed to read request body",
                );
            }
            Err(_) => {
                tracing::warn!(remote = %remote_addr, "request body timed out");
                return error_response(
                    StatusCode::REQUEST_TIMEOUT,
                    "REQUEST_TIMEOUT",
                    "request body timed out",
                );
            }
        };

        let ctx = Context::new(http::Request::from_parts(parts, body))
            .with_remote_addr(remote_addr)
            .with_tls(secure);
        let path = ctx.path().to_string();

        let dispatcher = self.dispatcher.clone();
        match tokio::task::spawn_blocking(move || dispatcher.dispatch_context(ctx)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(path = %path, error = %e, "dispatch task failed");
                FalconError::panicked(path).to_response()
            }
        }
    }
}

fn declared_length(headers: &http::HeaderMap) -> Option<usize> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.trim().parse().ok()
}

fn payload_too_large() -> Response {
    error_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        "PAYLOAD_TOO_LARGE",
        "request body too large",
    )
}

async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::bind(addr, e))
}

async fn stop_on_error<F>(task: F, shutdown: ShutdownSignal) -> Result<(), ServerError>
where
    F: std::future::Future<Output = Result<(), ServerError>>,
{
    let result = task.await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "listener failed, stopping server");
        shutdown.trigger();
    }
    result
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let envelope = ErrorEnvelope {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        },
    };
    let body = serde_json::to_vec(&envelope).unwrap_or_default();

    let mut response = http::Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
