//! Atomically replaceable dispatcher.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::{Context, Dispatcher, Request, Response};

/// A dispatcher shared across connections.
///
/// Each request loads the current snapshot once and keeps it for its whole
/// lifetime, so [`SharedDispatcher::replace`] never affects requests already
/// in flight.
#[derive(Debug, Clone)]
pub struct SharedDispatcher {
    current: Arc<ArcSwap<Dispatcher>>,
}

impl SharedDispatcher {
    /// Shares `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(dispatcher)),
        }
    }

    /// Returns the current snapshot.
    pub fn load(&self) -> Arc<Dispatcher> {
        self.current.load_full()
    }

    /// Installs a new snapshot and returns the previous one.
    pub fn replace(&self, dispatcher: Dispatcher) -> Arc<Dispatcher> {
        let previous = self.current.swap(Arc::new(dispatcher));
        tracing::info!(routes = self.current.load().router().len(), "route table replaced");
        previous
    }

    /// Dispatches a request against the current snapshot.
    pub fn dispatch(&self, request: Request) -> Response {
        self.load().dispatch(request)
    }

    /// Dispatches a prepared context against the current snapshot.
    pub fn dispatch_context(&self, ctx: Context) -> Response {
        self.load().dispatch_context(ctx)
    }
}

impl From<Dispatcher> for SharedDispatcher {
    fn from(dispatcher: Dispatcher) -> Self {
        Self::new(dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::App;
    use bytes::Bytes;
    use http::StatusCode;

    fn get(path: &str) -> Request {
        http::Request::builder().uri(path).body(Bytes::new()).unwrap()
    }

    #[test]
    fn test_replace_swaps_routes() {
        let mut first = App::new();
        first.get("/old", |_: &mut Context| {}).unwrap();
        let shared = SharedDispatcher::new(first.build().unwrap());

        assert_eq!(shared.dispatch(get("/old")).status(), StatusCode::OK);
        assert_eq!(shared.dispatch(get("/new")).status(), StatusCode::NOT_FOUND);

        let mut second = App::new();
        second.get("/new", |_: &mut Context| {}).unwrap();
        let previous = shared.replace(second.build().unwrap());

        assert_eq!(previous.router().len(), 1);
        assert_eq!(shared.dispatch(get("/old")).status(), StatusCode::NOT_FOUND);
        assert_eq!(shared.dispatch(get("/new")).status(), StatusCode::OK);
    }

    #[test]
    fn test_loaded_snapshot_survives_replace() {
        let mut app = App::new();
        app.get("/kept", |_: &mut Context| {}).unwrap();
        let shared = SharedDispatcher::new(app.build().unwrap());

        let held = shared.load();
        shared.replace(App::new().build().unwrap());

        assert_eq!(held.dispatch(get("/kept")).status(), StatusCode::OK);
        assert_eq!(shared.dispatch(get("/kept")).status(), StatusCode::NOT_FOUND);
    }
}
