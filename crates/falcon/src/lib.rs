//! # Falcon
//!
//! An embeddable HTTP router. Patterns such as `/users/:id` compile to
//! anchored regular expressions; routes compose into groups and namespaces
//! that carry before/after middleware; a dispatcher runs global middleware,
//! the matching namespace, then the flat route table, then the not-found
//! handler.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use falcon::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), falcon::Error> {
//!     let mut app = App::new();
//!
//!     app.use_middleware(|ctx| {
//!         ctx.set_header("server", "falcon");
//!     });
//!     app.get("/", |ctx| {
//!         ctx.write_str("hello");
//!     })?;
//!
//!     let v1 = AppNamespace::new("/v1")?
//!         .before(middleware(|ctx| ctx.header("authorization").is_some()))
//!         .route(AppRoute::get("/users/:id", handler(|ctx| {
//!             let id = ctx.param("id").unwrap_or_default().to_string();
//!             ctx.write_str(&id);
//!         }))?)?;
//!     app.namespace(v1)?;
//!
//!     let config = ConfigLoader::new()
//!         .with_optional_file("falcon.toml")?
//!         .with_dotenv()?
//!         .load()?;
//!     falcon::run(app, config).await
//! }
//! ```
//!
//! ## Crates
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`router`] | `falcon-router` | patterns, routes, groups, namespaces, lookup |
//! | [`core`] | `falcon-core` | context, middleware flow, dispatcher |
//! | [`server`] | `falcon-server` | HTTP/HTTPS listeners, graceful shutdown |
//! | [`config`] | `falcon-config` | layered TOML/JSON/env configuration |
//! | [`telemetry`] | `falcon-telemetry` | logging and Prometheus metrics |

#![doc(html_root_url = "https://docs.rs/falcon/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod run;

pub use falcon_config as config;
pub use falcon_core as core;
pub use falcon_router as router;
pub use falcon_server as server;
pub use falcon_telemetry as telemetry;

pub use self::error::{Error, Result};
pub use self::run::{run, run_with_shutdown, server_config};

/// Common imports.
pub mod prelude {
    pub use falcon_config::{ConfigLoader, FalconConfig};
    pub use falcon_core::{
        handler, middleware, App, AppGroup, AppGroupItem, AppNamespace, AppRoute, Context,
        Dispatcher, FalconError, Flow, SharedDispatcher,
    };
    pub use falcon_router::{RouteError, RouteMethod};
    pub use falcon_server::{Server, ServerConfig, ShutdownSignal};
}
