//! Handler and middleware types.
//!
//! Handlers and middleware are synchronous closures over a [`Context`]. The
//! server runs them on the blocking pool, so they may block without stalling
//! the reactor.
//!
//! # Example
//!
//! ```rust
//! use falcon_core::{handler, middleware, Context, Flow};
//!
//! let hello = handler(|ctx: &mut Context| {
//!     ctx.write_str("hello");
//! });
//!
//! let auth = middleware(|ctx: &mut Context| {
//!     if ctx.header("authorization").is_some() {
//!         Flow::Continue
//!     } else {
//!         ctx.set_status(http::StatusCode::UNAUTHORIZED);
//!         Flow::Halt
//!     }
//! });
//! # let _ = (hello, auth);
//! ```

use std::sync::Arc;

use crate::Context;

/// A route handler.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// A middleware function.
///
/// Returning [`Flow::Halt`] intercepts the request: nothing after it runs.
pub type Middleware = Arc<dyn Fn(&mut Context) -> Flow + Send + Sync>;

/// Whether the request continues after a middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Run the next middleware or the handler.
    #[default]
    Continue,
    /// Stop here; the response is whatever the context holds.
    Halt,
}

impl Flow {
    /// Returns true for [`Flow::Halt`].
    pub fn is_halt(self) -> bool {
        self == Self::Halt
    }
}

impl From<bool> for Flow {
    /// `true` continues, `false` halts.
    fn from(proceed: bool) -> Self {
        if proceed {
            Self::Continue
        } else {
            Self::Halt
        }
    }
}

impl From<()> for Flow {
    fn from((): ()) -> Self {
        Self::Continue
    }
}

/// Wraps a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`Middleware`].
///
/// The closure may return a [`Flow`], a `bool` (`false` halts) or `()`.
pub fn middleware<F, R>(f: F) -> Middleware
where
    F: Fn(&mut Context) -> R + Send + Sync + 'static,
    R: Into<Flow>,
{
    Arc::new(move |ctx: &mut Context| -> Flow { f(ctx).into() })
}
