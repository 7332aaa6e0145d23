//! Namespaces: static, mutually exclusive prefixes.

use std::fmt;

use crate::error::{RouteError, RouteResult};
use crate::method::RouteMethod;
use crate::pattern::CompiledPattern;
use crate::route::Route;

/// A static prefix owning a tree of routes.
///
/// Unlike a [`Group`](crate::Group), a namespace prefix cannot contain
/// placeholders, and the prefixes registered on one router may not overlap:
/// `/api` and `/api/v1` cannot both be namespaces.
///
/// # Example
///
/// ```rust
/// use falcon_router::{Namespace, Route};
///
/// let ns: Namespace<&str, &str> = Namespace::new("/admin")
///     .unwrap()
///     .before("require_admin")
///     .route(Route::get("/users", "list").unwrap())
///     .unwrap();
///
/// assert_eq!(ns.prefix(), "/admin");
/// assert_eq!(ns.routes().next().unwrap().pattern().as_str(), "/admin/users");
/// assert!(Namespace::<&str, &str>::new("/users/:id").is_err());
/// ```
#[derive(Clone)]
pub struct Namespace<H, M> {
    root: Route<H, M>,
    before: Vec<M>,
    after: Vec<M>,
}

impl<H, M> Namespace<H, M> {
    /// Creates an empty namespace.
    pub fn new(prefix: &str) -> RouteResult<Self> {
        let pattern = CompiledPattern::compile(prefix)?;
        if pattern.is_dynamic() {
            return Err(RouteError::DynamicNamespace {
                prefix: pattern.as_str().to_string(),
            });
        }
        Ok(Self {
            root: Route::container(pattern),
            before: Vec::new(),
            after: Vec::new(),
        })
    }

    /// Creates a namespace holding `routes`.
    pub fn compose(prefix: &str, routes: impl IntoIterator<Item = Route<H, M>>) -> RouteResult<Self> {
        let mut ns = Self::new(prefix)?;
        for route in routes {
            ns.add(route)?;
        }
        Ok(ns)
    }

    /// Appends middleware run before every route in the namespace.
    pub fn before(mut self, middleware: M) -> Self {
        self.before.push(middleware);
        self
    }

    /// Appends middleware run after every route in the namespace.
    pub fn after(mut self, middleware: M) -> Self {
        self.after.push(middleware);
        self
    }

    /// Attaches a route under the prefix.
    pub fn add(&mut self, route: Route<H, M>) -> RouteResult<&mut Self> {
        let route = route.with_prefix(self.prefix())?;
        self.root.insert_child(route)?;
        Ok(self)
    }

    /// Attaches a route, consuming and returning the namespace.
    pub fn route(mut self, route: Route<H, M>) -> RouteResult<Self> {
        self.add(route)?;
        Ok(self)
    }

    /// Registers a handler at `pattern` relative to the prefix.
    pub fn insert(&mut self, method: RouteMethod, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.add(Route::new(method, pattern, handler)?)
    }

    /// Registers a GET handler.
    pub fn get(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Get, pattern, handler)
    }

    /// Registers a POST handler.
    pub fn post(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Post, pattern, handler)
    }

    /// Registers a PUT handler.
    pub fn put(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Put, pattern, handler)
    }

    /// Registers a PATCH handler.
    pub fn patch(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Patch, pattern, handler)
    }

    /// Registers a DELETE handler.
    pub fn delete(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Delete, pattern, handler)
    }

    /// Registers a HEAD handler.
    pub fn head(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Head, pattern, handler)
    }

    /// Registers an OPTIONS handler.
    pub fn options(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Options, pattern, handler)
    }

    /// Registers a handler for every method.
    pub fn any(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Any, pattern, handler)
    }

    /// Returns the canonical prefix.
    pub fn prefix(&self) -> &str {
        self.root.pattern().as_str()
    }

    /// Returns true if either prefix is a string prefix of the other.
    pub fn overlaps(&self, other: &str) -> bool {
        let own = self.prefix();
        own.starts_with(other) || other.starts_with(own)
    }

    /// Returns the root route, which holds any handler registered at the
    /// prefix itself.
    pub fn root(&self) -> &Route<H, M> {
        &self.root
    }

    /// Returns the namespace before middleware.
    pub fn before_middleware(&self) -> &[M] {
        &self.before
    }

    /// Returns the namespace after middleware.
    pub fn after_middleware(&self) -> &[M] {
        &self.after
    }

    pub(crate) fn into_parts(self) -> (Route<H, M>, Vec<M>, Vec<M>) {
        (self.root, self.before, self.after)
    }

    /// Returns the routes below the prefix in insertion order.
    pub fn routes(&self) -> impl Iterator<Item = &Route<H, M>> {
        self.root.children()
    }

    /// Counts routes with at least one handler.
    pub fn route_count(&self) -> usize {
        self.root.route_count()
    }
}

impl<H, M> fmt::Debug for Namespace<H, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("root", &self.root)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}
