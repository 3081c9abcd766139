//! Route registry and dispatch.
//!
//! A [`Router`] maps a normalized `method:path` key to an ordered handler
//! chain. Lookup is an exact dictionary match on the request's method and
//! **resource template** (e.g. `/items/{id}`); path parameters are expected to
//! be resolved already by the gateway.
//!
//! ```rust,ignore
//! let mut router = Router::new();
//! router
//!     .get("/items", chain![list_items])
//!     .post("/items", chain![require_key, create_item])
//!     .set_not_found_handler(not_found);
//!
//! let response = router.dispatch(request);
//! ```
//!
//! # Serving snapshots
//!
//! `Router` keeps its registry behind an `Arc` and clones cheaply. Registration
//! needs `&mut self` and copies the registry if it is shared, so a clone that
//! is being served never observes later registrations.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::future::{Ready, ready};
use http::StatusCode;
use tower::Service;
use tracing::{Level, debug, span, trace};

use crate::context::Context;
use crate::error::HandlerResult;
use crate::executor::{decode_event, execute};
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::request::Request;
use crate::response::Response;

/// Builds the registry key for a method and path.
///
/// Both parts are trimmed and the result is lowercased, so `"GET"`/`" /items "`
/// and `"get"`/`"/items"` share a key.
pub fn route_key(method: &str, path: &str) -> String {
    format!("{}:{}", method.trim(), path.trim()).to_lowercase()
}

// =============================================================================
// Route
// =============================================================================

/// A registered method and path with its handler chain.
#[derive(Clone)]
pub struct Route {
    method: String,
    path: String,
    handlers: Vec<BoxedHandler>,
}

impl Route {
    /// Returns the method the route was registered with.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the resource path the route was registered with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the route's handlers in execution order.
    pub fn handlers(&self) -> &[BoxedHandler] {
        &self.handlers
    }

    /// Returns the number of handlers in the chain.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}

// =============================================================================
// Router
// =============================================================================

#[derive(Clone)]
struct RouterInner {
    routes: HashMap<String, Route>,
    not_found: BoxedHandler,
}

/// Registry of routes plus a single not-found fallback.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates an empty router using [`default_not_found`] as its fallback.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RouterInner {
                routes: HashMap::new(),
                not_found: into_handler(default_not_found),
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut RouterInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Registers `handlers` for `method` and `path`.
    ///
    /// Registering the same key again replaces the previous route entirely.
    pub fn add<I>(&mut self, method: &str, path: &str, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        let key = route_key(method, path);
        let route = Route {
            method: method.to_string(),
            path: path.to_string(),
            handlers: handlers.into_iter().collect(),
        };

        debug!(
            route = %key,
            handler_count = route.handlers.len(),
            "Registered route"
        );
        if self.inner_mut().routes.insert(key, route).is_some() {
            trace!(method, path, "Replaced existing route");
        }
        self
    }

    /// Registers a `GET` route.
    pub fn get<I>(&mut self, path: &str, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.add("get", path, handlers)
    }

    /// Registers a `PUT` route.
    pub fn put<I>(&mut self, path: &str, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.add("put", path, handlers)
    }

    /// Registers a `POST` route.
    pub fn post<I>(&mut self, path: &str, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.add("post", path, handlers)
    }

    /// Registers a `DELETE` route.
    pub fn delete<I>(&mut self, path: &str, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.add("delete", path, handlers)
    }

    /// Registers a `HEAD` route.
    pub fn head<I>(&mut self, path: &str, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.add("head", path, handlers)
    }

    /// Registers a `PATCH` route.
    pub fn patch<I>(&mut self, path: &str, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.add("patch", path, handlers)
    }

    /// Registers an `OPTIONS` route.
    pub fn options<I>(&mut self, path: &str, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        self.add("options", path, handlers)
    }

    /// Replaces the fallback run for unmatched requests.
    pub fn set_not_found_handler<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.inner_mut().not_found = into_handler(handler);
        self
    }

    /// Looks up the route registered for `method` and `path`.
    pub fn route(&self, method: &str, path: &str) -> Option<&Route> {
        self.inner.routes.get(&route_key(method, path))
    }

    /// Returns the number of registered routes.
    pub fn route_count(&self) -> usize {
        self.inner.routes.len()
    }

    /// Iterates over the registered routes in no particular order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.inner.routes.values()
    }

    /// Routes `request` to its handler chain and returns the response.
    ///
    /// Requests without a route, or whose route has no handlers, run the
    /// not-found handler as a one-handler chain.
    pub fn dispatch(&self, request: Request) -> Response {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            request_id = %request.request_context.request_id,
            method = %request.http_method,
            resource = %request.resource,
        );
        let _enter = span.enter();

        let key = route_key(&request.http_method, &request.resource);
        let mut ctx = Context::new(request);

        match self.inner.routes.get(&key) {
            Some(route) if !route.handlers.is_empty() => {
                trace!(route = %key, handler_count = route.handlers.len(), "Route matched");
                execute(Response::no_content(), &mut ctx, &route.handlers)
            }
            _ => {
                debug!(route = %key, "No route matched, running not-found handler");
                execute(
                    Response::no_content(),
                    &mut ctx,
                    std::slice::from_ref(&self.inner.not_found),
                )
            }
        }
    }

    /// Decodes a raw event envelope and dispatches it.
    ///
    /// A malformed envelope is logged and answered with the generic 500
    /// response; no handler runs.
    pub fn handle_event(&self, raw: &[u8]) -> Response {
        match decode_event(raw) {
            Some(request) => self.dispatch(request),
            None => Response::internal_error(),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("route_count", &self.inner.routes.len())
            .finish_non_exhaustive()
    }
}

/// The fallback used when none is configured.
///
/// Logs the whole context for operators and answers `404` with an empty body.
pub fn default_not_found(ctx: &mut Context) -> HandlerResult {
    match ctx.dump() {
        Ok(dump) => debug!(context = %dump, "No route for request"),
        Err(err) => debug!(error = %err, "No route for request; context not serializable"),
    }
    ctx.no_content(StatusCode::NOT_FOUND.as_u16())
}

// ============================================================================
// Tower Service Implementation for Router
// ============================================================================

/// Lets tower middleware wrap dispatch.
///
/// ```rust,ignore
/// use tower::{ServiceBuilder, ServiceExt};
///
/// let service = ServiceBuilder::new().service(router);
/// let response = service.oneshot(request).await?;
/// ```
impl Service<Request> for Router {
    type Response = Response;
    type Error = Infallible;
    type Future = Ready<Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        ready(Ok(self.dispatch(request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain;
    use crate::error::HttpError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn request(method: &str, resource: &str) -> Request {
        Request::builder().method(method).resource(resource).build()
    }

    fn ok(ctx: &mut Context) -> HandlerResult {
        ctx.string(200, "ok")
    }

    #[test]
    fn test_route_key_normalization() {
        assert_eq!(route_key("GET", " /items "), "get:/items");
        assert_eq!(route_key(" Post", "/Items/{ID}"), "post:/items/{id}");
    }

    #[test]
    fn test_lookup_ignores_case_and_whitespace() {
        let mut router = Router::new();
        router.add("GET", " /items ", chain![ok]);

        let resp = router.dispatch(request("get", "/items"));
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body, "ok");

        let route = router.route("get", "/items").unwrap();
        assert_eq!(route.method(), "GET");
        assert_eq!(route.path(), " /items ");
    }

    #[test]
    fn test_method_sugar_registers_routes() {
        let mut router = Router::new();
        router
            .get("/a", chain![ok])
            .put("/a", chain![ok])
            .post("/a", chain![ok])
            .delete("/a", chain![ok])
            .head("/a", chain![ok])
            .patch("/a", chain![ok])
            .options("/a", chain![ok]);

        assert_eq!(router.route_count(), 7);
        for method in ["GET", "PUT", "POST", "DELETE", "HEAD", "PATCH", "OPTIONS"] {
            assert_eq!(router.dispatch(request(method, "/a")).status_code, 200);
        }
    }

    #[test]
    fn test_reregistration_overwrites() {
        let old_runs = Arc::new(AtomicUsize::new(0));
        let old_clone = Arc::clone(&old_runs);

        let mut router = Router::new();
        router.get(
            "/items",
            chain![
                move |ctx: &mut Context| {
                    old_clone.fetch_add(1, Ordering::SeqCst);
                    ctx.string(200, "old")
                },
                |ctx: &mut Context| ctx.continue_chain(),
            ],
        );
        router.add("GET", "/items", chain![|ctx: &mut Context| ctx.string(200, "new")]);

        let resp = router.dispatch(request("GET", "/items"));
        assert_eq!(resp.body, "new");
        assert_eq!(router.route("get", "/items").unwrap().handler_count(), 1);
        assert_eq!(old_runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unmatched_route_uses_default_not_found() {
        let router = Router::new();
        let resp = router.dispatch(request("GET", "/missing"));
        assert_eq!(resp.status_code, 404);
        assert_eq!(resp.body, "");
        assert!(resp.headers.is_empty());
    }

    #[test]
    fn test_method_mismatch_is_not_found() {
        let mut router = Router::new();
        router.get("/items", chain![ok]);
        assert_eq!(router.dispatch(request("POST", "/items")).status_code, 404);
    }

    #[test]
    fn test_routes_on_resource_not_path() {
        let mut router = Router::new();
        router.get("/items/{id}", chain![|ctx: &mut Context| {
            let id = ctx.path_param("id").to_string();
            ctx.string(200, id)
        }]);

        let req = Request::builder()
            .method("GET")
            .path("/items/42")
            .resource("/items/{id}")
            .path_param("id", "42")
            .build();
        assert_eq!(router.dispatch(req).body, "42");
    }

    #[test]
    fn test_custom_not_found_handler() {
        let mut router = Router::new();
        router.set_not_found_handler(|_: &mut Context| -> HandlerResult {
            Err(HttpError::not_found("no such route").into())
        });

        let resp = router.dispatch(request("GET", "/nope"));
        assert_eq!(resp.status_code, 404);
        assert_eq!(resp.body, "no such route");
    }

    #[test]
    fn test_not_found_handler_is_replaced() {
        let mut router = Router::new();
        router
            .set_not_found_handler(|ctx: &mut Context| ctx.string(404, "first"))
            .set_not_found_handler(|ctx: &mut Context| ctx.string(404, "second"));

        assert_eq!(router.dispatch(request("GET", "/x")).body, "second");
    }

    #[test]
    fn test_empty_route_falls_back_to_not_found() {
        let mut router = Router::new();
        router.get("/empty", chain![]);
        router.set_not_found_handler(|ctx: &mut Context| ctx.string(404, "fallback"));

        let resp = router.dispatch(request("GET", "/empty"));
        assert_eq!(resp.status_code, 404);
        assert_eq!(resp.body, "fallback");
    }

    #[test]
    fn test_handle_event_parses_and_dispatches() {
        let mut router = Router::new();
        router.post("/echo", chain![|ctx: &mut Context| {
            let body = ctx.request().body.clone();
            ctx.string(200, body)
        }]);

        let raw = br#"{"httpMethod":"POST","resource":"/echo","body":"ping"}"#;
        let resp = router.handle_event(raw);
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body, "ping");
    }

    #[test]
    fn test_handle_event_malformed_envelope() {
        let mut router = Router::new();
        router.set_not_found_handler(|ctx: &mut Context| ctx.string(404, "never"));

        let resp = router.handle_event(b"not json at all");
        assert_eq!(resp, Response::internal_error());
    }

    #[test]
    fn test_clone_is_a_frozen_snapshot() {
        let mut router = Router::new();
        router.get("/a", chain![ok]);

        let serving = router.clone();
        router.get("/b", chain![ok]);

        assert_eq!(serving.route_count(), 1);
        assert_eq!(serving.dispatch(request("GET", "/b")).status_code, 404);
        assert_eq!(router.dispatch(request("GET", "/b")).status_code, 200);
    }

    #[tokio::test]
    async fn test_router_as_tower_service() {
        let mut router = Router::new();
        router.get("/svc", chain![ok]);

        let resp = router.oneshot(request("GET", "/svc")).await.unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body, "ok");
    }
}
