//! Application builder.
//!
//! [`App`] is a [`RouterBuilder`] bound to Falcon's [`Handler`] and
//! [`Middleware`] types, taking plain closures where the router takes
//! values. Groups and namespaces are composed with the router types directly,
//! using the [`handler`](crate::handler()) and
//! [`middleware`](crate::middleware()) helpers.
//!
//! # Example
//!
//! ```rust
//! use falcon_core::{handler, middleware, App, AppGroup, AppRoute, Context, Flow};
//!
//! # fn main() -> Result<(), falcon_core::FalconError> {
//! let mut app = App::new();
//! app.use_middleware(|ctx: &mut Context| {
//!     ctx.set_header("x-powered-by", "falcon");
//! });
//! app.get("/", |ctx: &mut Context| {
//!     ctx.write_str("index");
//! })?;
//! app.add_group(
//!     AppGroup::compose(
//!         "/api",
//!         [AppRoute::get("/ping", handler(|ctx: &mut Context| {
//!             ctx.write_str("pong");
//!         }))?],
//!     )?
//!     .before(middleware(|_: &mut Context| Flow::Continue)),
//! )?;
//!
//! let dispatcher = app.build()?;
//! assert_eq!(dispatcher.router().len(), 2);
//! # Ok(())
//! # }
//! ```

use falcon_router::{Group, GroupItem, Namespace, Route, RouteMethod, RouterBuilder};

use crate::error::FalconResult;
use crate::handler::{handler, middleware, Flow, Handler, Middleware};
use crate::{Context, Dispatcher};

/// A route carrying Falcon handlers.
pub type AppRoute = Route<Handler, Middleware>;

/// A group carrying Falcon handlers.
pub type AppGroup = Group<Handler, Middleware>;

/// A group item carrying Falcon handlers.
pub type AppGroupItem = GroupItem<Handler, Middleware>;

/// A namespace carrying Falcon handlers.
pub type AppNamespace = Namespace<Handler, Middleware>;

/// Registers routes and builds a [`Dispatcher`].
#[derive(Debug, Default)]
pub struct App {
    builder: RouterBuilder<Handler, Middleware>,
}

impl App {
    /// Creates an empty application.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends global middleware.
    ///
    /// The closure may return a [`Flow`], a `bool` or `()`.
    pub fn use_middleware<F, R>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Context) -> R + Send + Sync + 'static,
        R: Into<Flow>,
    {
        self.builder.use_middleware(middleware(f));
        self
    }

    /// Registers a handler for `method` on the flat route tree.
    pub fn route<F>(&mut self, method: RouteMethod, pattern: &str, f: F) -> FalconResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.builder.route(method, pattern, handler(f))?;
        Ok(self)
    }

    /// Adds a prebuilt route to the flat route tree.
    pub fn add_route(&mut self, route: AppRoute) -> FalconResult<&mut Self> {
        self.builder.add_route(route)?;
        Ok(self)
    }

    /// Registers a GET handler.
    pub fn get<F>(&mut self, pattern: &str, f: F) -> FalconResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(RouteMethod::Get, pattern, f)
    }

    /// Registers a PUT handler.
    pub fn put<F>(&mut self, pattern: &str, f: F) -> FalconResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(RouteMethod::Put, pattern, f)
    }

    /// Registers a POST handler.
    pub fn post<F>(&mut self, pattern: &str, f: F) -> FalconResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(RouteMethod::Post, pattern, f)
    }

    /// Registers a PATCH handler.
    pub fn patch<F>(&mut self, pattern: &str, f: F) -> FalconResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(RouteMethod::Patch, pattern, f)
    }

    /// Registers a DELETE handler.
    pub fn delete<F>(&mut self, pattern: &str, f: F) -> FalconResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(RouteMethod::Delete, pattern, f)
    }

    /// Registers a HEAD handler.
    pub fn head<F>(&mut self, pattern: &str, f: F) -> FalconResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(RouteMethod::Head, pattern, f)
    }

    /// Registers an OPTIONS handler.
    pub fn options<F>(&mut self, pattern: &str, f: F) -> FalconResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(RouteMethod::Options, pattern, f)
    }

    /// Registers a handler for any method without a specific handler.
    pub fn any<F>(&mut self, pattern: &str, f: F) -> FalconResult<&mut Self>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(RouteMethod::Any, pattern, f)
    }

    /// Composes a group from `items` and registers it.
    pub fn group<I>(&mut self, prefix: &str, items: I) -> FalconResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<AppGroupItem>,
    {
        self.builder.group(prefix, items)?;
        Ok(self)
    }

    /// Registers a prebuilt group.
    pub fn add_group(&mut self, group: AppGroup) -> FalconResult<&mut Self> {
        self.builder.add_group(group)?;
        Ok(self)
    }

    /// Registers a namespace.
    pub fn namespace(&mut self, ns: AppNamespace) -> FalconResult<&mut Self> {
        self.builder.namespace(ns)?;
        Ok(self)
    }

    /// Sets the handler for requests no route matches.
    pub fn not_found<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.builder.not_found(handler(f));
        self
    }

    /// Sets the handler for paths that match without a handler for the
    /// method.
    pub fn not_allowed<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.builder.not_allowed(handler(f));
        self
    }

    /// Returns the number of routes registered so far.
    pub fn route_count(&self) -> usize {
        self.builder.route_count()
    }

    /// Compiles the registrations into a dispatcher.
    pub fn build(self) -> FalconResult<Dispatcher> {
        let router = self.builder.build()?;
        tracing::debug!(
            routes = router.len(),
            namespaces = router.namespace_count(),
            middleware = router.middleware().len(),
            "dispatcher built"
        );
        Ok(Dispatcher::new(router))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FalconError;
    use falcon_router::RouteError;

    #[test]
    fn test_duplicate_handler_is_error() {
        let mut app = App::new();
        app.get("/item", |_: &mut Context| {}).unwrap();
        let err = app.get("/item", |_: &mut Context| {}).unwrap_err();
        assert!(matches!(
            err,
            FalconError::Route(RouteError::MethodConflict { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let mut app = App::new();
        let err = app.get("/broken/(open", |_: &mut Context| {}).unwrap_err();
        assert!(matches!(
            err,
            FalconError::Route(RouteError::UnbalancedParentheses { .. })
        ));
    }

    #[test]
    fn test_route_count() {
        let mut app = App::new();
        app.get("/a", |_: &mut Context| {})
            .unwrap()
            .post("/a", |_: &mut Context| {})
            .unwrap()
            .get("/b", |_: &mut Context| {})
            .unwrap();
        app.group(
            "/api",
            [AppRoute::get("/ping", handler(|_: &mut Context| {})).unwrap()],
        )
        .unwrap();
        assert_eq!(app.build().unwrap().router().len(), 3);
    }

    #[test]
    fn test_overlapping_namespace() {
        let mut app = App::new();
        app.namespace(AppNamespace::new("/admin").unwrap()).unwrap();
        let err = app
            .namespace(AppNamespace::new("/admin/users").unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            FalconError::Route(RouteError::NamespaceOverlap { .. })
        ));
    }
}
