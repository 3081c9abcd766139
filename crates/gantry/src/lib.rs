//! # Gantry
//!
//! Request routing and handler chains for API-gateway proxy events.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────┐     ┌─────────────────────────────────┐
//! │   Runtime    │────▶│ Router │────▶│ "get:/items"  auth ▸ list       │──▶ Response
//! │ (EventSource)│     │        │────▶│ "post:/items" auth ▸ create     │──▶ Response
//! └──────────────┘     └────────┘────▶│ not-found handler               │──▶ Response
//!                                     └─────────────────────────────────┘
//! ```
//!
//! - **Runtime**: reads events, writes one response per event, owns config and logging
//! - **Router**: exact, case-insensitive `method:resource` lookup
//! - **Handlers**: plain functions over a shared per-request `Context`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gantry::prelude::*;
//!
//! fn health(ctx: &mut Context) -> HandlerResult {
//!     ctx.string(200, "ok")
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut router = Router::new();
//!     router.get("/health", chain![health]);
//!
//!     Runtime::new().serve(router).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log lines

pub use gantry_core as core;
pub use gantry_runtime as runtime;

pub use gantry_core::chain;

/// Commonly used types for writing handlers and serving them.
///
/// ```rust,ignore
/// use gantry::prelude::*;
/// ```
pub mod prelude {
    // Entry point
    pub use gantry_runtime::{Runtime, ServeStats};

    // Routing and handlers
    pub use gantry_core::chain;
    pub use gantry_core::{
        BoxedHandler, Context, Handler, HandlerError, HandlerResult, HttpError, Request,
        Response, Router, into_handler,
    };
}
