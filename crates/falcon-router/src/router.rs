//! Immutable route snapshot.
//!
//! A [`Router`] is produced once by [`RouterBuilder::build`] and never changes
//! afterwards. Routes live in a single arena; each scope keeps an index of
//! its static routes by canonical path and the arena indices of its dynamic
//! routes in registration order.
//!
//! [`RouterBuilder::build`]: crate::RouterBuilder::build

use std::collections::HashMap;
use std::fmt;

use http::Method;

use crate::error::{RouteError, RouteResult};
use crate::group::Group;
use crate::method::{Actions, RouteMethod};
use crate::namespace::Namespace;
use crate::params::Params;
use crate::pattern::CompiledPattern;
use crate::route::Route;

/// Where a route was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Inside a namespace
    Namespace,
    /// Inside a group
    Group,
    /// Directly on the router
    Tree,
}

impl ScopeKind {
    /// Returns a lowercase label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Group => "group",
            Self::Tree => "tree",
        }
    }
}

/// A route resolved for one request.
pub struct RouteMatch<'a, H, M> {
    /// Handler for the request method
    pub handler: &'a H,
    /// Captured path parameters
    pub params: Params,
    /// Scope and route before middleware, outermost first
    pub before: &'a [M],
    /// Route and scope after middleware, innermost first
    pub after: &'a [M],
    /// Canonical pattern of the matched route
    pub pattern: &'a str,
    /// Scope the route was registered in
    pub scope: ScopeKind,
    /// Prefix of the owning namespace or group, `/` for the flat tree
    pub owner: &'a str,
}

impl<H, M> fmt::Debug for RouteMatch<'_, H, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .field("scope", &self.scope)
            .field("owner", &self.owner)
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

/// Result of looking up a request.
pub enum Lookup<'a, H, M> {
    /// A route matched the path and has a handler for the method.
    Found(RouteMatch<'a, H, M>),
    /// At least one route matched the path, none for this method.
    MethodNotAllowed(Vec<RouteMethod>),
    /// Nothing matched the path.
    NotFound,
}

impl<'a, H, M> Lookup<'a, H, M> {
    /// Returns the match, if any.
    pub fn found(self) -> Option<RouteMatch<'a, H, M>> {
        match self {
            Self::Found(m) => Some(m),
            _ => None,
        }
    }

    /// Returns true if nothing matched the path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl<H, M> fmt::Debug for Lookup<'_, H, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(m) => f.debug_tuple("Found").field(m).finish(),
            Self::MethodNotAllowed(allowed) => {
                f.debug_tuple("MethodNotAllowed").field(allowed).finish()
            }
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Summary of one registered route, for logging and introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo<'a> {
    /// Canonical pattern
    pub pattern: &'a str,
    /// Registered methods
    pub methods: Vec<RouteMethod>,
    /// Scope kind
    pub scope: ScopeKind,
    /// Owning prefix
    pub owner: &'a str,
}

struct Entry<H, M> {
    pattern: CompiledPattern,
    actions: Actions<H>,
    before: Vec<M>,
    after: Vec<M>,
    scope: ScopeKind,
    owner: String,
}

/// Per-scope lookup index into the entry arena.
#[derive(Default)]
struct Table {
    /// Identity → entry, for every route in the scope
    index: HashMap<String, usize>,
    /// Dynamic entries in registration order
    dynamic: Vec<usize>,
}

impl Table {
    fn find<'r, H, M>(
        &self,
        entries: &'r [Entry<H, M>],
        method: &Method,
        path: &str,
        key: &str,
        path_hits: &mut Vec<usize>,
    ) -> Option<(usize, &'r H, Params)> {
        if let Some(&idx) = self.index.get(key) {
            let entry = &entries[idx];
            if !entry.pattern.is_dynamic() {
                match entry.actions.resolve(method) {
                    Some(handler) => return Some((idx, handler, Params::new())),
                    None => path_hits.push(idx),
                }
            }
        }

        for &idx in &self.dynamic {
            let entry = &entries[idx];
            if let Some(params) = entry.pattern.captures(path) {
                match entry.actions.resolve(method) {
                    Some(handler) => return Some((idx, handler, params)),
                    None => path_hits.push(idx),
                }
            }
        }

        None
    }
}

struct NamespaceTable {
    prefix: String,
    table: Table,
}

/// An immutable, fully compiled set of routes.
///
/// # Lookup order
///
/// 1. Namespaces whose prefix starts the path
/// 2. Groups, all of them flattened into one scope
/// 3. Routes registered directly on the builder
///
/// Within each scope a static route whose canonical pattern equals the path
/// is tried first, then dynamic routes in registration order. A route whose
/// pattern matches but has no handler for the method (nor an `ANY` handler)
/// is skipped; if nothing else matches the result is
/// [`Lookup::MethodNotAllowed`].
pub struct Router<H, M> {
    entries: Vec<Entry<H, M>>,
    namespaces: Vec<NamespaceTable>,
    groups: Table,
    tree: Table,
    middleware: Vec<M>,
    not_found: Option<H>,
    not_allowed: Option<H>,
}

impl<H, M> Router<H, M> {
    pub(crate) fn empty(middleware: Vec<M>, not_found: Option<H>, not_allowed: Option<H>) -> Self {
        Self {
            entries: Vec::new(),
            namespaces: Vec::new(),
            groups: Table::default(),
            tree: Table::default(),
            middleware,
            not_found,
            not_allowed,
        }
    }

    /// Looks up the route serving `method` at `path`.
    ///
    /// `path` is expected in canonical form; a single trailing slash is
    /// tolerated.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, H, M> {
        let key = exact_key(path);
        let mut path_hits = Vec::new();

        for ns in &self.namespaces {
            if !path.starts_with(ns.prefix.as_str()) {
                continue;
            }
            if let Some(hit) = ns.table.find(&self.entries, method, path, key, &mut path_hits) {
                return self.found(hit);
            }
        }

        if let Some(hit) = self.groups.find(&self.entries, method, path, key, &mut path_hits) {
            return self.found(hit);
        }

        if let Some(hit) = self.tree.find(&self.entries, method, path, key, &mut path_hits) {
            return self.found(hit);
        }

        if path_hits.is_empty() {
            return Lookup::NotFound;
        }

        let mut allowed: Vec<RouteMethod> = path_hits
            .into_iter()
            .flat_map(|idx| self.entries[idx].actions.methods())
            .collect();
        allowed.sort_unstable();
        allowed.dedup();
        Lookup::MethodNotAllowed(allowed)
    }

    fn found<'a>(&'a self, (idx, handler, params): (usize, &'a H, Params)) -> Lookup<'a, H, M> {
        let entry = &self.entries[idx];
        Lookup::Found(RouteMatch {
            handler,
            params,
            before: &entry.before,
            after: &entry.after,
            pattern: entry.pattern.as_str(),
            scope: entry.scope,
            owner: &entry.owner,
        })
    }

    /// Returns the global middleware in registration order.
    pub fn middleware(&self) -> &[M] {
        &self.middleware
    }

    /// Returns the configured not-found handler.
    pub fn not_found(&self) -> Option<&H> {
        self.not_found.as_ref()
    }

    /// Returns the configured not-allowed handler.
    pub fn not_allowed(&self) -> Option<&H> {
        self.not_allowed.as_ref()
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of namespaces.
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Lists every route in lookup order.
    pub fn routes(&self) -> impl Iterator<Item = RouteInfo<'_>> {
        self.entries.iter().map(|entry| RouteInfo {
            pattern: entry.pattern.as_str(),
            methods: entry.actions.methods(),
            scope: entry.scope,
            owner: &entry.owner,
        })
    }
}

impl<H, M: Clone> Router<H, M> {
    pub(crate) fn add_namespace(&mut self, ns: Namespace<H, M>) -> RouteResult<()> {
        let (root, before, after) = ns.into_parts();
        let root = root.into_parts();
        let prefix = root.pattern.as_str().to_string();
        let mut table = Table::default();

        if !root.actions.is_empty() {
            let entry = Entry {
                before: concat(&before, root.before),
                after: concat_after(root.after, &after),
                pattern: root.pattern,
                actions: root.actions,
                scope: ScopeKind::Namespace,
                owner: prefix.clone(),
            };
            self.push_entry(&mut table, entry)?;
        }
        for child in root.children {
            self.push_route(&mut table, child, &before, &after, ScopeKind::Namespace, &prefix)?;
        }

        self.namespaces.push(NamespaceTable { prefix, table });
        Ok(())
    }

    pub(crate) fn add_groups(&mut self, root: Group<H, M>) -> RouteResult<()> {
        let mut table = std::mem::take(&mut self.groups);
        let result = self.push_group(&mut table, root, &[], &[]);
        self.groups = table;
        result
    }

    pub(crate) fn add_tree(&mut self, routes: Vec<Route<H, M>>) -> RouteResult<()> {
        let mut table = std::mem::take(&mut self.tree);
        let result = routes
            .into_iter()
            .try_for_each(|route| self.push_route(&mut table, route, &[], &[], ScopeKind::Tree, "/"));
        self.tree = table;
        result
    }

    fn push_group(
        &mut self,
        table: &mut Table,
        group: Group<H, M>,
        inherited_before: &[M],
        inherited_after: &[M],
    ) -> RouteResult<()> {
        let parts = group.into_parts();
        let before = concat(inherited_before, parts.before);
        let after = concat_after(parts.after, inherited_after);

        for route in parts.routes {
            self.push_route(table, route, &before, &after, ScopeKind::Group, &parts.prefix)?;
        }
        for sub in parts.groups {
            self.push_group(table, sub, &before, &after)?;
        }
        Ok(())
    }

    fn push_route(
        &mut self,
        table: &mut Table,
        route: Route<H, M>,
        inherited_before: &[M],
        inherited_after: &[M],
        scope: ScopeKind,
        owner: &str,
    ) -> RouteResult<()> {
        let parts = route.into_parts();
        let before = concat(inherited_before, parts.before);
        let after = concat_after(parts.after, inherited_after);

        if !parts.actions.is_empty() {
            let entry = Entry {
                pattern: parts.pattern,
                actions: parts.actions,
                before: before.clone(),
                after: after.clone(),
                scope,
                owner: owner.to_string(),
            };
            self.push_entry(table, entry)?;
        }
        for child in parts.children {
            self.push_route(table, child, &before, &after, scope, owner)?;
        }
        Ok(())
    }

    fn push_entry(&mut self, table: &mut Table, entry: Entry<H, M>) -> RouteResult<()> {
        if let Some(&existing) = table.index.get(entry.pattern.identity()) {
            return Err(RouteError::ShadowedPattern {
                pattern: entry.pattern.as_str().to_string(),
                first: self.entries[existing].owner.clone(),
                second: entry.owner,
            });
        }

        let idx = self.entries.len();
        table
            .index
            .insert(entry.pattern.identity().to_string(), idx);
        if entry.pattern.is_dynamic() {
            table.dynamic.push(idx);
        }
        self.entries.push(entry);
        Ok(())
    }
}

impl<H, M> fmt::Debug for Router<H, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes().collect::<Vec<_>>())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

fn exact_key(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// `outer` followed by `own`.
fn concat<M: Clone>(outer: &[M], own: Vec<M>) -> Vec<M> {
    let mut out = Vec::with_capacity(outer.len() + own.len());
    out.extend_from_slice(outer);
    out.extend(own);
    out
}

/// `own` followed by `outer`.
fn concat_after<M: Clone>(own: Vec<M>, outer: &[M]) -> Vec<M> {
    let mut out = own;
    out.extend_from_slice(outer);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RouterBuilder;
    use crate::group::GroupItem;

    type TestBuilder = RouterBuilder<&'static str, &'static str>;

    fn handler_at<'a>(router: &'a Router<&'static str, &'static str>, method: &Method, path: &str) -> Option<&'a str> {
        router.lookup(method, path).found().map(|m| *m.handler)
    }

    #[test]
    fn test_router_empty() {
        let router = TestBuilder::new().build().unwrap();
        assert!(router.is_empty());
        assert!(router.lookup(&Method::GET, "/").is_not_found());
    }

    #[test]
    fn test_router_static_route() {
        let mut builder = TestBuilder::new();
        builder.get("/health", "health").unwrap();
        let router = builder.build().unwrap();

        assert_eq!(handler_at(&router, &Method::GET, "/health"), Some("health"));
        assert_eq!(handler_at(&router, &Method::GET, "/health/"), Some("health"));
        assert!(router.lookup(&Method::GET, "/healthz").is_not_found());
    }

    #[test]
    fn test_router_root_route() {
        let mut builder = TestBuilder::new();
        builder.get("/", "index").unwrap();
        let router = builder.build().unwrap();
        assert_eq!(handler_at(&router, &Method::GET, "/"), Some("index"));
    }

    #[test]
    fn test_router_params() {
        let mut builder = TestBuilder::new();
        builder.get("/user/:id", "user").unwrap();
        let router = builder.build().unwrap();

        let m = router.lookup(&Method::GET, "/user/42").found().unwrap();
        assert_eq!(*m.handler, "user");
        assert_eq!(m.params.get("id"), Some("42"));
        assert_eq!(m.pattern, "/user/:id");
        assert_eq!(m.scope, ScopeKind::Tree);

        assert!(router.lookup(&Method::GET, "/user/42/").found().is_some());
        assert!(router.lookup(&Method::GET, "/user").is_not_found());
        assert!(router.lookup(&Method::GET, "/user/42/x").is_not_found());
    }

    #[test]
    fn test_router_exact_beats_dynamic() {
        for static_first in [true, false] {
            let mut builder = TestBuilder::new();
            if static_first {
                builder.get("/a/b", "static").unwrap();
                builder.get("/a/:x", "dynamic").unwrap();
            } else {
                builder.get("/a/:x", "dynamic").unwrap();
                builder.get("/a/b", "static").unwrap();
            }
            let router = builder.build().unwrap();
            assert_eq!(handler_at(&router, &Method::GET, "/a/b"), Some("static"));
            assert_eq!(handler_at(&router, &Method::GET, "/a/c"), Some("dynamic"));
        }
    }

    #[test]
    fn test_router_escaped_literal_route() {
        let mut builder = TestBuilder::new();
        builder.get(r"/a/\(b", "paren").unwrap();
        builder.get(r"/files/\d+", "digits").unwrap();
        let router = builder.build().unwrap();

        assert_eq!(handler_at(&router, &Method::GET, "/a/(b"), Some("paren"));
        assert_eq!(handler_at(&router, &Method::GET, "/a/(b/"), Some("paren"));
        assert!(router.lookup(&Method::GET, r"/a/\(b").is_not_found());
        assert_eq!(handler_at(&router, &Method::GET, "/files/123"), Some("digits"));
    }

    #[test]
    fn test_router_dynamic_in_registration_order() {
        let mut builder = TestBuilder::new();
        builder.get("/f/:name", "first").unwrap();
        builder.get("/f/(a|b)", "second").unwrap();
        let router = builder.build().unwrap();
        assert_eq!(handler_at(&router, &Method::GET, "/f/a"), Some("first"));
    }

    #[test]
    fn test_router_any_fallback() {
        let mut builder = TestBuilder::new();
        builder.any("/echo", "any").unwrap();
        builder.post("/echo", "post").unwrap();
        let router = builder.build().unwrap();
        assert_eq!(handler_at(&router, &Method::POST, "/echo"), Some("post"));
        assert_eq!(handler_at(&router, &Method::DELETE, "/echo"), Some("any"));
        assert_eq!(handler_at(&router, &Method::TRACE, "/echo"), Some("any"));
    }

    #[test]
    fn test_router_method_not_allowed() {
        let mut builder = TestBuilder::new();
        builder.get("/items", "list").unwrap();
        builder.post("/items", "create").unwrap();
        let router = builder.build().unwrap();

        match router.lookup(&Method::DELETE, "/items") {
            Lookup::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![RouteMethod::Get, RouteMethod::Post]);
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_router_method_skips_to_next_candidate() {
        let mut builder = TestBuilder::new();
        builder.get("/a/b", "static-get").unwrap();
        builder.post("/a/:x", "dynamic-post").unwrap();
        let router = builder.build().unwrap();
        assert_eq!(handler_at(&router, &Method::POST, "/a/b"), Some("dynamic-post"));
    }

    #[test]
    fn test_router_group_before_tree() {
        let mut builder = TestBuilder::new();
        builder.get("/api/ping", "tree").unwrap();
        builder
            .group("/api", [GroupItem::from(Route::get("/ping", "group").unwrap())])
            .unwrap();
        let router = builder.build().unwrap();

        let m = router.lookup(&Method::GET, "/api/ping").found().unwrap();
        assert_eq!(*m.handler, "group");
        assert_eq!(m.scope, ScopeKind::Group);
        assert_eq!(m.owner, "/api");
    }

    #[test]
    fn test_router_namespace_before_group() {
        let mut builder = TestBuilder::new();
        builder
            .group("/admin", [GroupItem::from(Route::get("/users", "group").unwrap())])
            .unwrap();
        builder
            .namespace(
                Namespace::new("/admin")
                    .unwrap()
                    .route(Route::get("/users", "namespace").unwrap())
                    .unwrap(),
            )
            .unwrap();
        let router = builder.build().unwrap();
        assert_eq!(handler_at(&router, &Method::GET, "/admin/users"), Some("namespace"));
        assert_eq!(router.namespace_count(), 1);
    }

    #[test]
    fn test_router_group_middleware_order() {
        let inner = Group::compose("/b", [Route::get("/c", "h").unwrap()])
            .unwrap()
            .before("b2")
            .after("a2");
        let outer = Group::compose("/a", [GroupItem::from(inner)])
            .unwrap()
            .before("b1")
            .after("a1");

        let mut builder = TestBuilder::new();
        builder.add_group(outer).unwrap();
        let router = builder.build().unwrap();

        let m = router.lookup(&Method::GET, "/a/b/c").found().unwrap();
        assert_eq!(m.before, ["b1", "b2"]);
        assert_eq!(m.after, ["a2", "a1"]);
    }

    #[test]
    fn test_router_route_middleware_inside_scope() {
        let route = Route::get("/x", "h").unwrap().before("rb").after("ra");
        let group = Group::compose("/g", [route]).unwrap().before("gb").after("ga");

        let mut builder = TestBuilder::new();
        builder.add_group(group).unwrap();
        let router = builder.build().unwrap();

        let m = router.lookup(&Method::GET, "/g/x").found().unwrap();
        assert_eq!(m.before, ["gb", "rb"]);
        assert_eq!(m.after, ["ra", "ga"]);
    }

    #[test]
    fn test_router_namespace_middleware() {
        let mut ns = Namespace::new("/admin").unwrap().before("nb").after("na");
        ns.add(Route::get("/", "root").unwrap().before("rb")).unwrap();
        ns.get("/users", "users").unwrap();

        let mut builder = TestBuilder::new();
        builder.namespace(ns).unwrap();
        let router = builder.build().unwrap();

        let root = router.lookup(&Method::GET, "/admin").found().unwrap();
        assert_eq!(root.before, ["nb", "rb"]);
        let users = router.lookup(&Method::GET, "/admin/users").found().unwrap();
        assert_eq!(users.before, ["nb"]);
        assert_eq!(users.after, ["na"]);
    }

    #[test]
    fn test_router_tree_has_no_scope_middleware() {
        let mut builder = TestBuilder::new();
        builder.use_middleware("global");
        builder.get("/flat", "flat").unwrap();
        let router = builder.build().unwrap();

        let m = router.lookup(&Method::GET, "/flat").found().unwrap();
        assert!(m.before.is_empty());
        assert!(m.after.is_empty());
        assert_eq!(router.middleware(), ["global"]);
    }

    #[test]
    fn test_router_shadowed_across_groups() {
        let mut builder = TestBuilder::new();
        builder
            .add_group(Group::compose("/a/b", [Route::get("/c", "one").unwrap()]).unwrap())
            .unwrap();
        builder
            .add_group(
                Group::compose(
                    "/a",
                    [GroupItem::from(Route::post("/b/c", "two").unwrap())],
                )
                .unwrap(),
            )
            .unwrap();

        match builder.build() {
            Err(RouteError::ShadowedPattern { pattern, first, second }) => {
                assert_eq!(pattern, "/a/b/c");
                assert_eq!(first, "/a/b");
                assert_eq!(second, "/a");
            }
            other => panic!("expected ShadowedPattern, got {other:?}"),
        }
    }

    #[test]
    fn test_router_routes_listing() {
        let mut builder = TestBuilder::new();
        builder.get("/a", "a").unwrap();
        builder.put("/a", "a2").unwrap();
        builder.get("/b/:id", "b").unwrap();
        let router = builder.build().unwrap();

        let routes: Vec<_> = router.routes().collect();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].pattern, "/a");
        assert_eq!(routes[0].methods, vec![RouteMethod::Get, RouteMethod::Put]);
        assert_eq!(routes[1].scope, ScopeKind::Tree);
    }

    #[test]
    fn test_router_fallback_handlers() {
        let mut builder = TestBuilder::new();
        builder.not_found("nf").not_allowed("na");
        let router = builder.build().unwrap();
        assert_eq!(router.not_found(), Some(&"nf"));
        assert_eq!(router.not_allowed(), Some(&"na"));
    }
}
