//! # Falcon Server
//!
//! Serves a [`falcon_core::Dispatcher`] over HTTP/1.1 and, optionally, HTTPS.
//!
//! - [`Server`] - accept loop, per-connection hyper service, graceful drain
//! - [`ServerConfig`] / [`TlsConfig`] - listener settings
//! - [`ShutdownSignal`] - shared shutdown trigger, optionally bound to OS signals
//! - [`ConnectionTracker`] - open-connection accounting for the drain phase

#![doc(html_root_url = "https://docs.rs/falcon-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod server;
mod shutdown;
mod tls;

pub use config::{
    ServerConfig, ServerConfigBuilder, TlsConfig, DEFAULT_HTTP_ADDR, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use error::ServerError;
pub use server::Server;
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use tls::load_acceptor;
