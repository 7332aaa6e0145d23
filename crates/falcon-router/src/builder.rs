//! Route registration.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{RouteError, RouteResult};
use crate::group::{Group, GroupItem};
use crate::method::RouteMethod;
use crate::namespace::Namespace;
use crate::route::Route;
use crate::router::Router;

/// Collects routes, groups, namespaces and middleware, then compiles them
/// into an immutable [`Router`].
///
/// Every registration method validates its input immediately: a malformed
/// pattern, a duplicate method handler or an overlapping namespace is
/// returned as an error from the call that introduced it. Handlers that did
/// not collide are still registered, so the builder stays usable for
/// diagnostics, but an application should treat any error as fatal.
///
/// # Example
///
/// ```rust
/// use falcon_router::{GroupItem, Namespace, Route, RouterBuilder};
/// use http::Method;
///
/// # fn main() -> Result<(), falcon_router::RouteError> {
/// let mut builder: RouterBuilder<&str, &str> = RouterBuilder::new();
/// builder
///     .use_middleware("request_id")
///     .get("/", "index")?
///     .get("/users/:id", "show_user")?;
/// builder.group("/api", [GroupItem::from(Route::get("/ping", "pong")?)])?;
/// builder.namespace(Namespace::new("/admin")?.route(Route::get("/stats", "stats")?)?)?;
///
/// let router = builder.build()?;
/// let hit = router.lookup(&Method::GET, "/users/7").found().unwrap();
/// assert_eq!(*hit.handler, "show_user");
/// assert_eq!(hit.params.get("id"), Some("7"));
/// # Ok(())
/// # }
/// ```
pub struct RouterBuilder<H, M> {
    middleware: Vec<M>,
    tree: IndexMap<String, Route<H, M>>,
    groups: Group<H, M>,
    namespaces: IndexMap<String, Namespace<H, M>>,
    not_found: Option<H>,
    not_allowed: Option<H>,
}

impl<H, M> Default for RouterBuilder<H, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, M> RouterBuilder<H, M> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
            tree: IndexMap::new(),
            groups: Group::new("/"),
            namespaces: IndexMap::new(),
            not_found: None,
            not_allowed: None,
        }
    }

    /// Appends global middleware, run for every request before routing.
    pub fn use_middleware(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Registers a handler on the flat route tree.
    pub fn route(&mut self, method: RouteMethod, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.add_route(Route::new(method, pattern, handler)?)
    }

    /// Adds a prebuilt route to the flat route tree.
    pub fn add_route(&mut self, route: Route<H, M>) -> RouteResult<&mut Self> {
        match self.tree.get_mut(route.pattern().identity()) {
            Some(existing) => existing.merge(route)?,
            None => {
                self.tree
                    .insert(route.pattern().identity().to_string(), route);
            }
        }
        Ok(self)
    }

    /// Registers a GET handler.
    pub fn get(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.route(RouteMethod::Get, pattern, handler)
    }

    /// Registers a PUT handler.
    pub fn put(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.route(RouteMethod::Put, pattern, handler)
    }

    /// Registers a POST handler.
    pub fn post(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.route(RouteMethod::Post, pattern, handler)
    }

    /// Registers a PATCH handler.
    pub fn patch(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.route(RouteMethod::Patch, pattern, handler)
    }

    /// Registers a DELETE handler.
    pub fn delete(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.route(RouteMethod::Delete, pattern, handler)
    }

    /// Registers a HEAD handler.
    pub fn head(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.route(RouteMethod::Head, pattern, handler)
    }

    /// Registers an OPTIONS handler.
    pub fn options(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.route(RouteMethod::Options, pattern, handler)
    }

    /// Registers a handler for every method.
    pub fn any(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.route(RouteMethod::Any, pattern, handler)
    }

    /// Composes a group at `prefix` from `items` and registers it.
    pub fn group<I>(&mut self, prefix: &str, items: I) -> RouteResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<GroupItem<H, M>>,
    {
        self.add_group(Group::compose(prefix, items)?)
    }

    /// Registers a prebuilt group.
    pub fn add_group(&mut self, group: Group<H, M>) -> RouteResult<&mut Self> {
        self.groups.add(group)?;
        Ok(self)
    }

    /// Registers a namespace.
    ///
    /// Fails if its prefix overlaps a namespace already registered.
    pub fn namespace(&mut self, ns: Namespace<H, M>) -> RouteResult<&mut Self> {
        if let Some(existing) = self.namespaces.values().find(|other| other.overlaps(ns.prefix())) {
            tracing::warn!(
                prefix = %ns.prefix(),
                existing = %existing.prefix(),
                "namespace overlaps a registered namespace"
            );
            return Err(RouteError::NamespaceOverlap {
                prefix: ns.prefix().to_string(),
                existing: existing.prefix().to_string(),
            });
        }
        self.namespaces.insert(ns.prefix().to_string(), ns);
        Ok(self)
    }

    /// Sets the handler for requests no route matches.
    pub fn not_found(&mut self, handler: H) -> &mut Self {
        self.not_found = Some(handler);
        self
    }

    /// Sets the handler for requests whose path matches but method does not.
    pub fn not_allowed(&mut self, handler: H) -> &mut Self {
        self.not_allowed = Some(handler);
        self
    }

    /// Counts registered routes across every scope.
    pub fn route_count(&self) -> usize {
        self.tree.values().map(Route::route_count).sum::<usize>()
            + self.groups.route_count()
            + self.namespaces.values().map(Namespace::route_count).sum::<usize>()
    }

    /// Compiles the registrations into an immutable router.
    ///
    /// Fails if two groups register the same full pattern.
    pub fn build(self) -> RouteResult<Router<H, M>>
    where
        M: Clone,
    {
        let mut router = Router::empty(self.middleware, self.not_found, self.not_allowed);

        for (_, ns) in self.namespaces {
            router.add_namespace(ns)?;
        }
        router.add_groups(self.groups)?;
        router.add_tree(self.tree.into_values().collect())?;

        tracing::debug!(
            routes = router.len(),
            namespaces = router.namespace_count(),
            middleware = router.middleware().len(),
            "route table built"
        );
        Ok(router)
    }
}

impl<H, M> fmt::Debug for RouterBuilder<H, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("tree", &self.tree.values().collect::<Vec<_>>())
            .field("groups", &self.groups)
            .field("namespaces", &self.namespaces.values().collect::<Vec<_>>())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
