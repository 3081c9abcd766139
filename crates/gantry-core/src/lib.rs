//! # Gantry Core
//!
//! Routing and handler-chain execution for API-gateway proxy events.
//!
//! One inbound event is decoded into a [`Request`], wrapped in a per-request
//! [`Context`], routed by exact `method:resource` match to an ordered chain of
//! [`Handler`]s, and collapsed into a single [`Response`].
//!
//! ```text
//! ┌──────────────┐   ┌─────────┐   ┌────────┐   ┌──────────┐   ┌──────────┐
//! │ Event Source │──▶│ Request │──▶│ Router │──▶│ Executor │──▶│ Response │
//! └──────────────┘   └─────────┘   └────────┘   └──────────┘   └──────────┘
//!                                      │  handler ▸ handler ▸ handler
//!                                      └─ shared Context
//! ```
//!
//! Chain semantics: handlers run in order, the **last** response set wins, and
//! the **first** error ends the chain. An [`HttpError`] becomes the response
//! verbatim; any other error becomes a generic 500 and is logged.
//!
//! Diagnostics are emitted through `tracing`; this crate never installs a
//! subscriber.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gantry_core::{Context, HandlerResult, HttpError, Router, chain};
//!
//! fn require_key(ctx: &mut Context) -> HandlerResult {
//!     if ctx.header("x-api-key").is_empty() {
//!         return Err(HttpError::unauthorized("").into());
//!     }
//!     ctx.continue_chain()
//! }
//!
//! fn list_items(ctx: &mut Context) -> HandlerResult {
//!     ctx.json(200, &["lamp", "desk"])
//! }
//!
//! let mut router = Router::new();
//! router.get("/items", chain![require_key, list_items]);
//!
//! let response = router.handle_event(raw_event_bytes);
//! ```

pub mod context;
pub mod error;
pub mod executor;
pub mod handler;
pub mod request;
pub mod response;
pub mod router;

pub use context::Context;
pub use error::{
    BindError, BindResult, BoxError, EnvelopeError, HandlerError, HandlerResult, HttpError,
    SerializationError, reason_phrase,
};
pub use executor::{execute, handle_event};
pub use handler::{BoxedHandler, Handler, into_handler};
pub use request::{Identity, Request, RequestBuilder, RequestContext, StringMap};
pub use response::Response;
pub use router::{Route, Router, default_not_found, route_key};

/// Prelude for common imports.
pub mod prelude {
    pub use super::chain;
    pub use super::{
        BoxedHandler, Context, Handler, HandlerError, HandlerResult, HttpError, Request,
        Response, Router, into_handler,
    };
}
