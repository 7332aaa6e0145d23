//! Prefix groups.
//!
//! A [`Group`] owns routes and sub-groups under a common prefix plus before and
//! after middleware that every route inside inherits. Attaching a route or a
//! group to a group re-prefixes it immediately, so every pattern stored in a
//! group is already fully qualified.
//!
//! ```text
//! Group "/api"         before [auth]        after [audit]
//!   ├── GET  /api/ping
//!   └── Group "/api/v1"  before [version]   after [stamp]
//!         └── GET /api/v1/users/:id
//!
//! GET /api/v1/users/7 runs: auth, version, handler, stamp, audit
//! ```

use std::fmt;

use indexmap::IndexMap;

use crate::error::RouteResult;
use crate::method::RouteMethod;
use crate::path::canonicalize;
use crate::route::Route;

/// An item attached to a group.
pub enum GroupItem<H, M> {
    /// A single route
    Route(Route<H, M>),
    /// A nested group
    Group(Group<H, M>),
}

impl<H, M> From<Route<H, M>> for GroupItem<H, M> {
    fn from(route: Route<H, M>) -> Self {
        Self::Route(route)
    }
}

impl<H, M> From<Group<H, M>> for GroupItem<H, M> {
    fn from(group: Group<H, M>) -> Self {
        Self::Group(group)
    }
}

/// Routes and sub-groups sharing a prefix and middleware.
///
/// # Example
///
/// ```rust
/// use falcon_router::{Group, GroupItem, Route};
///
/// let v1: Group<&str, &str> = Group::compose("/v1", [
///     GroupItem::from(Route::get("/users/:id", "show").unwrap()),
/// ]).unwrap();
///
/// let api = Group::compose("/api", [
///     GroupItem::from(Route::get("/ping", "pong").unwrap()),
///     GroupItem::from(v1),
/// ]).unwrap().before("auth");
///
/// let patterns: Vec<_> = api.groups().flat_map(|g| g.routes()).map(|r| r.pattern().as_str()).collect();
/// assert_eq!(patterns, ["/api/v1/users/:id"]);
/// ```
#[derive(Clone)]
pub struct Group<H, M> {
    prefix: String,
    routes: IndexMap<String, Route<H, M>>,
    groups: IndexMap<String, Group<H, M>>,
    before: Vec<M>,
    after: Vec<M>,
}

impl<H, M> Group<H, M> {
    /// Creates an empty group.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: canonicalize(prefix),
            routes: IndexMap::new(),
            groups: IndexMap::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Creates a group and attaches `items` in order.
    pub fn compose<I>(prefix: &str, items: I) -> RouteResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<GroupItem<H, M>>,
    {
        let mut group = Self::new(prefix);
        for item in items {
            group.add(item)?;
        }
        Ok(group)
    }

    /// Appends middleware run before every route in the group.
    pub fn before(mut self, middleware: M) -> Self {
        self.before.push(middleware);
        self
    }

    /// Appends middleware run after every route in the group.
    pub fn after(mut self, middleware: M) -> Self {
        self.after.push(middleware);
        self
    }

    /// Attaches a route or group under this group's prefix.
    pub fn add(&mut self, item: impl Into<GroupItem<H, M>>) -> RouteResult<&mut Self> {
        match item.into() {
            GroupItem::Route(route) => self.add_route(route)?,
            GroupItem::Group(group) => self.add_group(group)?,
        }
        Ok(self)
    }

    /// Attaches an item, consuming and returning the group.
    pub fn with(mut self, item: impl Into<GroupItem<H, M>>) -> RouteResult<Self> {
        self.add(item)?;
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

    /// Registers a PUT handler.
    pub fn put(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Put, pattern, handler)
    }

    /// Registers a POST handler.
    pub fn post(&mut self, pattern: &str, handler: H) -> RouteResult<&mut Self> {
        self.insert(RouteMethod::Post, pattern, handler)
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

    /// Returns the fully qualified prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the group's own routes in insertion order.
    pub fn routes(&self) -> impl Iterator<Item = &Route<H, M>> {
        self.routes.values()
    }

    /// Returns the direct sub-groups in insertion order.
    pub fn groups(&self) -> impl Iterator<Item = &Group<H, M>> {
        self.groups.values()
    }

    /// Returns the group's own before middleware.
    pub fn before_middleware(&self) -> &[M] {
        &self.before
    }

    /// Returns the group's own after middleware.
    pub fn after_middleware(&self) -> &[M] {
        &self.after
    }

    /// Counts routes in this group and every sub-group.
    pub fn route_count(&self) -> usize {
        self.routes.values().map(Route::route_count).sum::<usize>()
            + self.groups.values().map(Group::route_count).sum::<usize>()
    }

    pub(crate) fn into_parts(self) -> GroupParts<H, M> {
        GroupParts {
            prefix: self.prefix,
            routes: self.routes.into_values().collect(),
            groups: self.groups.into_values().collect(),
            before: self.before,
            after: self.after,
        }
    }

    fn add_route(&mut self, route: Route<H, M>) -> RouteResult<()> {
        let route = route.with_prefix(&self.prefix)?;
        match self.routes.get_mut(route.pattern().identity()) {
            Some(existing) => existing.merge(route),
            None => {
                self.routes
                    .insert(route.pattern().identity().to_string(), route);
                Ok(())
            }
        }
    }

    fn add_group(&mut self, group: Group<H, M>) -> RouteResult<()> {
        let group = group.with_prefix(&self.prefix)?;
        match self.groups.get_mut(&group.prefix) {
            Some(existing) => existing.merge(group),
            None => {
                self.groups.insert(group.prefix.clone(), group);
                Ok(())
            }
        }
    }

    /// Re-prefixes this group, its routes and its sub-groups recursively.
    fn with_prefix(self, prefix: &str) -> RouteResult<Self> {
        let mut routes = IndexMap::with_capacity(self.routes.len());
        for (_, route) in self.routes {
            let route = route.with_prefix(prefix)?;
            routes.insert(route.pattern().identity().to_string(), route);
        }

        let mut groups = IndexMap::with_capacity(self.groups.len());
        for (_, group) in self.groups {
            let group = group.with_prefix(prefix)?;
            groups.insert(group.prefix.clone(), group);
        }

        Ok(Self {
            prefix: canonicalize(&format!("{}/{}", prefix, self.prefix)),
            routes,
            groups,
            before: self.before,
            after: self.after,
        })
    }

    /// Folds a group with the same prefix into this one.
    fn merge(&mut self, other: Group<H, M>) -> RouteResult<()> {
        let mut first_error = None;

        self.before.extend(other.before);
        self.after.extend(other.after);

        for (identity, route) in other.routes {
            let result = match self.routes.get_mut(&identity) {
                Some(existing) => existing.merge(route),
                None => {
                    self.routes.insert(identity, route);
                    Ok(())
                }
            };
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }

        for (prefix, group) in other.groups {
            let result = match self.groups.get_mut(&prefix) {
                Some(existing) => existing.merge(group),
                None => {
                    self.groups.insert(prefix, group);
                    Ok(())
                }
            };
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

/// A group taken apart for snapshot building.
pub(crate) struct GroupParts<H, M> {
    pub(crate) prefix: String,
    pub(crate) routes: Vec<Route<H, M>>,
    pub(crate) groups: Vec<Group<H, M>>,
    pub(crate) before: Vec<M>,
    pub(crate) after: Vec<M>,
}

impl<H, M> fmt::Debug for Group<H, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.prefix)
            .field("routes", &self.routes.values().collect::<Vec<_>>())
            .field("groups", &self.groups.values().collect::<Vec<_>>())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouteError;

    type TestGroup = Group<&'static str, &'static str>;
    type TestRoute = Route<&'static str, &'static str>;

    #[test]
    fn test_routes_are_prefixed() {
        let mut group = TestGroup::new("api/");
        group.get("/ping", "pong").unwrap();
        assert_eq!(group.prefix(), "/api");
        let route = group.routes().next().unwrap();
        assert_eq!(route.pattern().as_str(), "/api/ping");
    }

    #[test]
    fn test_root_route_in_group() {
        let mut group = TestGroup::new("/users");
        group.get("/", "index").unwrap();
        assert_eq!(group.routes().next().unwrap().pattern().as_str(), "/users");
    }

    #[test]
    fn test_nested_groups_are_reprefixed() {
        let inner = TestGroup::compose("/b", [TestRoute::get("/c/:id", "h").unwrap()]).unwrap();
        let middle = TestGroup::compose("/a", [GroupItem::from(inner)]).unwrap();
        let outer = TestGroup::compose("/root", [GroupItem::from(middle)]).unwrap();

        let a = outer.groups().next().unwrap();
        assert_eq!(a.prefix(), "/root/a");
        let b = a.groups().next().unwrap();
        assert_eq!(b.prefix(), "/root/a/b");
        let route = b.routes().next().unwrap();
        assert_eq!(route.pattern().as_str(), "/root/a/b/c/:id");
        assert!(route.pattern().is_match("/root/a/b/c/5"));
    }

    #[test]
    fn test_same_pattern_merges_methods() {
        let mut group = TestGroup::new("/api");
        group.get("/item", "show").unwrap();
        group.delete("/item", "destroy").unwrap();
        assert_eq!(group.routes().count(), 1);
        assert_eq!(
            group.routes().next().unwrap().actions().methods(),
            [RouteMethod::Get, RouteMethod::Delete]
        );
    }

    #[test]
    fn test_conflict_in_group() {
        let mut group = TestGroup::new("/api");
        group.get("/item", "first").unwrap();
        let err = group.get("/item", "second").unwrap_err();
        assert!(matches!(err, RouteError::MethodConflict { .. }));
        let route = group.routes().next().unwrap();
        assert_eq!(route.actions().get(RouteMethod::Get), Some(&"first"));
    }

    #[test]
    fn test_groups_with_same_prefix_merge() {
        let mut root = TestGroup::new("/");
        root.add(TestGroup::compose("/a", [TestRoute::get("/x", "x").unwrap()]).unwrap().before("m1"))
            .unwrap();
        root.add(TestGroup::compose("/a", [TestRoute::get("/y", "y").unwrap()]).unwrap().before("m2"))
            .unwrap();

        assert_eq!(root.groups().count(), 1);
        let a = root.groups().next().unwrap();
        assert_eq!(a.routes().count(), 2);
        assert_eq!(a.before_middleware(), ["m1", "m2"]);
    }

    #[test]
    fn test_conflict_across_merged_groups() {
        let mut root = TestGroup::new("/");
        root.add(TestGroup::compose("/a", [TestRoute::get("/x", "1").unwrap()]).unwrap())
            .unwrap();
        let err = root
            .add(TestGroup::compose("/a", [TestRoute::get("/x", "2").unwrap()]).unwrap())
            .unwrap_err();
        assert!(matches!(err, RouteError::MethodConflict { .. }));
    }

    #[test]
    fn test_route_count() {
        let inner = TestGroup::compose("/b", [TestRoute::get("/1", "h").unwrap()]).unwrap();
        let outer = TestGroup::compose(
            "/a",
            [
                GroupItem::from(TestRoute::get("/1", "h").unwrap()),
                GroupItem::from(TestRoute::get("/2", "h").unwrap()),
                GroupItem::from(inner),
            ],
        )
        .unwrap();
        assert_eq!(outer.route_count(), 3);
    }
}
