//! Routes: one compiled pattern and its handlers.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{RouteError, RouteResult};
use crate::method::{Actions, RouteMethod};
use crate::pattern::CompiledPattern;

/// A compiled pattern, its method table and optional route-level middleware.
///
/// Routes are created through the per-method constructors and can then be
/// attached to a [`Group`](crate::Group), a [`Namespace`](crate::Namespace) or
/// the flat tree of a [`RouterBuilder`](crate::RouterBuilder).
///
/// # Example
///
/// ```rust
/// use falcon_router::{Route, RouteMethod};
///
/// let route: Route<&str, ()> = Route::get("/users/:id", "show")
///     .unwrap()
///     .handle(RouteMethod::Delete, "destroy")
///     .unwrap();
///
/// assert_eq!(route.pattern().as_str(), "/users/:id");
/// assert_eq!(route.actions().methods(), [RouteMethod::Get, RouteMethod::Delete]);
/// ```
#[derive(Clone)]
pub struct Route<H, M> {
    pattern: CompiledPattern,
    actions: Actions<H>,
    before: Vec<M>,
    after: Vec<M>,
    children: IndexMap<String, Route<H, M>>,
}

impl<H, M> Route<H, M> {
    /// Creates a route with a single handler.
    pub fn new(method: RouteMethod, pattern: &str, handler: H) -> RouteResult<Self> {
        Ok(Self {
            actions: Actions::single(method, handler),
            ..Self::container(CompiledPattern::compile(pattern)?)
        })
    }

    /// Creates a GET route.
    pub fn get(pattern: &str, handler: H) -> RouteResult<Self> {
        Self::new(RouteMethod::Get, pattern, handler)
    }

    /// Creates a PUT route.
    pub fn put(pattern: &str, handler: H) -> RouteResult<Self> {
        Self::new(RouteMethod::Put, pattern, handler)
    }

    /// Creates a POST route.
    pub fn post(pattern: &str, handler: H) -> RouteResult<Self> {
        Self::new(RouteMethod::Post, pattern, handler)
    }

    /// Creates a PATCH route.
    pub fn patch(pattern: &str, handler: H) -> RouteResult<Self> {
        Self::new(RouteMethod::Patch, pattern, handler)
    }

    /// Creates a DELETE route.
    pub fn delete(pattern: &str, handler: H) -> RouteResult<Self> {
        Self::new(RouteMethod::Delete, pattern, handler)
    }

    /// Creates a HEAD route.
    pub fn head(pattern: &str, handler: H) -> RouteResult<Self> {
        Self::new(RouteMethod::Head, pattern, handler)
    }

    /// Creates an OPTIONS route.
    pub fn options(pattern: &str, handler: H) -> RouteResult<Self> {
        Self::new(RouteMethod::Options, pattern, handler)
    }

    /// Creates a route answering every method.
    pub fn any(pattern: &str, handler: H) -> RouteResult<Self> {
        Self::new(RouteMethod::Any, pattern, handler)
    }

    /// A route with no handlers, used as the root of a namespace or tree.
    pub(crate) fn container(pattern: CompiledPattern) -> Self {
        Self {
            pattern,
            actions: Actions::new(),
            before: Vec::new(),
            after: Vec::new(),
            children: IndexMap::new(),
        }
    }

    /// Adds a handler for another method.
    pub fn handle(mut self, method: RouteMethod, handler: H) -> RouteResult<Self> {
        if self.actions.insert(method, handler).is_err() {
            return Err(RouteError::conflict(self.pattern.as_str(), method));
        }
        Ok(self)
    }

    /// Appends route-level middleware run before the handler.
    pub fn before(mut self, middleware: M) -> Self {
        self.before.push(middleware);
        self
    }

    /// Appends route-level middleware run after the handler.
    pub fn after(mut self, middleware: M) -> Self {
        self.after.push(middleware);
        self
    }

    /// Returns the compiled pattern.
    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// Returns the method table.
    pub fn actions(&self) -> &Actions<H> {
        &self.actions
    }

    /// Returns the route-level before middleware.
    pub fn before_middleware(&self) -> &[M] {
        &self.before
    }

    /// Returns the route-level after middleware.
    pub fn after_middleware(&self) -> &[M] {
        &self.after
    }

    /// Returns the child routes in insertion order.
    pub fn children(&self) -> impl Iterator<Item = &Route<H, M>> {
        self.children.values()
    }

    /// Counts this route and its descendants that have at least one handler.
    pub fn route_count(&self) -> usize {
        usize::from(!self.actions.is_empty())
            + self.children.values().map(Route::route_count).sum::<usize>()
    }

    /// Recompiles this route and its children under `prefix`.
    pub(crate) fn with_prefix(self, prefix: &str) -> RouteResult<Self> {
        let pattern = self.pattern.with_prefix(prefix)?;
        let mut children = IndexMap::with_capacity(self.children.len());
        for (_, child) in self.children {
            let child = child.with_prefix(prefix)?;
            children.insert(child.pattern.identity().to_string(), child);
        }
        Ok(Self {
            pattern,
            actions: self.actions,
            before: self.before,
            after: self.after,
            children,
        })
    }

    pub(crate) fn into_parts(self) -> RouteParts<H, M> {
        RouteParts {
            pattern: self.pattern,
            actions: self.actions,
            before: self.before,
            after: self.after,
            children: self.children.into_values().collect(),
        }
    }

    /// Folds `other` into this route.
    ///
    /// Every non-conflicting handler, middleware and child is kept even when
    /// a conflict is found; the first conflict is returned afterwards.
    pub(crate) fn merge(&mut self, other: Self) -> RouteResult<()> {
        let mut first_error = None;

        for method in self.actions.merge(other.actions) {
            tracing::warn!(
                pattern = %self.pattern.as_str(),
                method = %method,
                "handler already registered, keeping the first"
            );
            first_error.get_or_insert_with(|| RouteError::conflict(self.pattern.as_str(), method));
        }

        self.before.extend(other.before);
        self.after.extend(other.after);

        for (_, child) in other.children {
            if let Err(err) = self.insert_child(child) {
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Inserts `route` below this one, merging with an existing route of the
    /// same identity.
    pub(crate) fn insert_child(&mut self, route: Self) -> RouteResult<()> {
        if route.pattern == self.pattern {
            return self.merge(route);
        }
        match self.children.get_mut(route.pattern.identity()) {
            Some(existing) => existing.merge(route),
            None => {
                self.children
                    .insert(route.pattern.identity().to_string(), route);
                Ok(())
            }
        }
    }
}

/// A route taken apart for snapshot building.
pub(crate) struct RouteParts<H, M> {
    pub(crate) pattern: CompiledPattern,
    pub(crate) actions: Actions<H>,
    pub(crate) before: Vec<M>,
    pub(crate) after: Vec<M>,
    pub(crate) children: Vec<Route<H, M>>,
}

impl<H, M> fmt::Debug for Route<H, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("actions", &self.actions)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("children", &self.children.values().collect::<Vec<_>>())
            .finish()
    }
}
