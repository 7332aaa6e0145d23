//! Request dispatch.
//!
//! ```text
//!   request ──► global middleware ──► lookup ──┬─► before ─► handler ─► after
//!                   │ halt                     ├─► not-allowed handler | 405
//!                   ▼                          └─► not-found handler   | 404
//!               response as left by the middleware
//! ```
//!
//! A halt at any middleware ends the request with whatever the context
//! holds. A panic anywhere in the chain becomes a 500 for that request; the
//! route table is read-only and is left untouched.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use falcon_router::{Lookup, Router};
use falcon_telemetry::{record_dispatch, record_intercept, DispatchOutcome, InFlightGuard};
use http::StatusCode;

use crate::error::{allow_header, FalconError};
use crate::handler::{Handler, Middleware};
use crate::{Context, Request, Response};

/// Route table specialized to Falcon handlers and middleware.
pub type RouteTable = Router<Handler, Middleware>;

/// Runs requests against an immutable route table.
pub struct Dispatcher {
    router: RouteTable,
}

enum Fallback {
    None,
    Error(FalconError),
}

impl Dispatcher {
    /// Wraps a built route table.
    pub fn new(router: RouteTable) -> Self {
        Self { router }
    }

    /// Returns the route table.
    pub fn router(&self) -> &RouteTable {
        &self.router
    }

    /// Dispatches a request with no connection information.
    pub fn dispatch(&self, request: Request) -> Response {
        self.dispatch_context(Context::new(request))
    }

    /// Dispatches a prepared context and returns its response.
    pub fn dispatch_context(&self, mut ctx: Context) -> Response {
        let started = Instant::now();
        let _in_flight = InFlightGuard::new();
        let method = ctx.method().clone();
        let path = ctx.path().to_string();

        let result = catch_unwind(AssertUnwindSafe(|| self.run(&mut ctx)));

        let (outcome, response) = match result {
            Ok((outcome, Fallback::None)) => (outcome, ctx.into_response()),
            Ok((outcome, Fallback::Error(err))) => (outcome, err.to_response()),
            Err(payload) => {
                tracing::error!(
                    http.method = %method,
                    http.path = %path,
                    error = panic_message(payload.as_ref()),
                    "handler panicked"
                );
                (
                    DispatchOutcome::Panicked,
                    FalconError::panicked(path.as_str()).to_response(),
                )
            }
        };

        let elapsed = started.elapsed();
        record_dispatch(outcome, method.as_str(), elapsed);
        tracing::debug!(
            http.method = %method,
            http.path = %path,
            http.status_code = response.status().as_u16(),
            outcome = %outcome,
            duration_ms = elapsed.as_secs_f64() * 1000.0,
            "request dispatched"
        );
        response
    }

    fn run(&self, ctx: &mut Context) -> (DispatchOutcome, Fallback) {
        for mw in self.router.middleware() {
            if mw(ctx).is_halt() {
                record_intercept("global");
                return (DispatchOutcome::Intercepted, Fallback::None);
            }
        }

        let method = ctx.method().clone();
        let path = ctx.path().to_string();

        match self.router.lookup(&method, &path) {
            Lookup::Found(hit) => {
                tracing::trace!(
                    route = hit.pattern,
                    scope = hit.scope.as_str(),
                    owner = hit.owner,
                    "route matched"
                );
                ctx.set_params(hit.params);

                for mw in hit.before {
                    if mw(ctx).is_halt() {
                        record_intercept("before");
                        return (DispatchOutcome::Intercepted, Fallback::None);
                    }
                }

                (hit.handler)(ctx);

                for mw in hit.after {
                    if mw(ctx).is_halt() {
                        record_intercept("after");
                        break;
                    }
                }
                (DispatchOutcome::Matched, Fallback::None)
            }
            Lookup::MethodNotAllowed(allowed) => {
                let fallback = if let Some(h) = self.router.not_allowed() {
                    ctx.set_status(StatusCode::METHOD_NOT_ALLOWED)
                        .set_header("allow", &allow_header(&allowed));
                    h(ctx);
                    Fallback::None
                } else {
                    Fallback::Error(FalconError::method_not_allowed(
                        method.as_str(),
                        path,
                        allowed,
                    ))
                };
                (DispatchOutcome::NotAllowed, fallback)
            }
            Lookup::NotFound => {
                let fallback = if let Some(h) = self.router.not_found() {
                    ctx.set_status(StatusCode::NOT_FOUND);
                    h(ctx);
                    Fallback::None
                } else {
                    Fallback::Error(FalconError::not_found(path))
                };
                (DispatchOutcome::NotFound, fallback)
            }
        }
    }

    /// Logs every route at `info`, in lookup order.
    pub fn log_routes(&self) {
        for route in self.router.routes() {
            let methods: Vec<&str> = route.methods.iter().map(|m| m.as_str()).collect();
            tracing::info!(
                route = route.pattern,
                methods = %methods.join(","),
                scope = route.scope.as_str(),
                owner = route.owner,
                "route registered"
            );
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.router.len())
            .field("namespaces", &self.router.namespace_count())
            .field("middleware", &self.router.middleware().len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
