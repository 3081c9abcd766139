//! Gantry Runtime: drives a router from an event source.
//!
//! This crate provides:
//! - Layered configuration (`config`), loaded with figment
//! - Logging setup (`logging`) on `tracing-subscriber`
//! - Event sources (`source`), including newline-delimited JSON over stdio
//! - The serve loop (`Runtime`)
//!
//! ```ignore
//! use gantry_core::{Router, chain};
//! use gantry_runtime::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut router = Router::new();
//!     router.get("/health", chain![|ctx: &mut gantry_core::Context| ctx.string(200, "ok")]);
//!
//!     Runtime::new().serve(router).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod source;

pub use config::{ConfigError, ConfigLoader, ConfigResult, GantryConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{Runtime, RuntimeBuilder, ServeStats};
pub use source::{EventSource, LineSource, stdio};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros, re-exported for handler code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
