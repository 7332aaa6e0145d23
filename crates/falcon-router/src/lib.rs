//! Pattern-compiling HTTP router for Falcon.
//!
//! This crate turns route registrations into an immutable lookup structure.
//! It is generic over the handler type `H` and the middleware type `M`, so it
//! knows nothing about requests or responses; `falcon-core` plugs in the
//! concrete types and runs the middleware chains.
//!
//! # Features
//!
//! - **Named parameters**: `/users/:id` captures one path segment as `id`
//! - **Regex fragments**: parenthesized text such as `/assets/(css|js)` is
//!   passed to the regex engine untouched
//! - **Groups**: shared prefixes and before/after middleware, nested freely
//! - **Namespaces**: static, mutually exclusive prefixes searched first
//! - **Registration-time conflicts**: duplicate handlers and overlapping
//!   namespaces are errors before the server starts, never at request time
//!
//! # Example
//!
//! ```rust
//! use falcon_router::{Group, GroupItem, Lookup, Route, RouterBuilder};
//! use http::Method;
//!
//! let mut builder: RouterBuilder<&str, &str> = RouterBuilder::new();
//! builder.get("/users/:id", "show_user").unwrap();
//! builder.get("/users/me", "show_me").unwrap();
//! builder
//!     .add_group(
//!         Group::compose("/api", [Route::get("/ping", "pong").unwrap()])
//!             .unwrap()
//!             .before("auth"),
//!     )
//!     .unwrap();
//!
//! let router = builder.build().unwrap();
//!
//! // Static routes win over dynamic ones regardless of registration order.
//! let hit = router.lookup(&Method::GET, "/users/me").found().unwrap();
//! assert_eq!(*hit.handler, "show_me");
//!
//! let hit = router.lookup(&Method::GET, "/api/ping").found().unwrap();
//! assert_eq!(hit.before, ["auth"]);
//!
//! assert!(matches!(router.lookup(&Method::POST, "/api/ping"), Lookup::MethodNotAllowed(_)));
//! ```
//!
//! # Lookup
//!
//! ```text
//!   request (method, canonical path)
//!        │
//!        ▼
//!   namespaces ──► groups ──► flat tree ──► not allowed / not found
//!        │            │            │
//!   exact index, then dynamic routes in registration order
//! ```

mod builder;
mod error;
mod group;
mod method;
mod namespace;
mod params;
mod path;
mod pattern;
mod route;
mod router;

pub use builder::RouterBuilder;
pub use error::{RouteError, RouteResult};
pub use group::{Group, GroupItem};
pub use method::{Actions, RouteMethod};
pub use namespace::Namespace;
pub use params::Params;
pub use path::{canonicalize, is_canonical};
pub use pattern::CompiledPattern;
pub use route::Route;
pub use router::{Lookup, RouteInfo, RouteMatch, Router, ScopeKind};
