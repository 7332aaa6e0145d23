//! # Falcon Core
//!
//! Request handling on top of [`falcon_router`]:
//!
//! - [`Context`] - per-request state: request accessors, path parameters, a
//!   data bag and the response under construction
//! - [`Handler`] / [`Middleware`] - synchronous closures over a context;
//!   middleware returns a [`Flow`]
//! - [`App`] - route registration with closures
//! - [`Dispatcher`] - runs global middleware, the matched scope chain and the
//!   not-found / not-allowed fallbacks, isolating handler panics
//! - [`SharedDispatcher`] - an atomically replaceable dispatcher
//! - [`FalconError`] - dispatch errors and their JSON envelope

#![doc(html_root_url = "https://docs.rs/falcon-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod context;
mod dispatch;
mod error;
mod handler;
mod shared;

use bytes::Bytes;
use http_body_util::Full;

pub use app::{App, AppGroup, AppGroupItem, AppNamespace, AppRoute};
pub use context::Context;
pub use dispatch::{Dispatcher, RouteTable};
pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, FalconError, FalconResult};
pub use handler::{handler, middleware, Flow, Handler, Middleware};
pub use shared::SharedDispatcher;

/// A request whose body has been collected.
pub type Request = http::Request<Bytes>;

/// A response with a complete body.
pub type Response = http::Response<Full<Bytes>>;
