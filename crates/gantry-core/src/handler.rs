//! Handler system.
//!
//! A handler is a unit of request-processing logic: it receives the shared
//! [`Context`] and returns success or a [`HandlerError`]. Plain functions and
//! closures are handlers through a blanket implementation:
//!
//! ```rust,ignore
//! fn require_key(ctx: &mut Context) -> HandlerResult {
//!     if ctx.header("x-api-key").is_empty() {
//!         return Err(HttpError::unauthorized("missing api key").into());
//!     }
//!     ctx.continue_chain()
//! }
//!
//! fn list_items(ctx: &mut Context) -> HandlerResult {
//!     ctx.json(200, &["lamp", "desk"])
//! }
//!
//! router.get("/items", chain![require_key, list_items]);
//! ```
//!
//! [`HandlerError`]: crate::error::HandlerError

use std::sync::Arc;

use crate::context::Context;
use crate::error::HandlerResult;

/// The core trait for request handlers.
pub trait Handler: Send + Sync + 'static {
    /// Processes the request carried by `ctx`.
    fn handle(&self, ctx: &mut Context) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, ctx: &mut Context) -> HandlerResult {
        self(ctx)
    }
}

/// A type-erased handler that can be stored in collections.
pub type BoxedHandler = Arc<dyn Handler>;

/// Converts a handler into a [`BoxedHandler`].
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}

/// Builds a `Vec<BoxedHandler>` from a list of handlers.
///
/// ```rust,ignore
/// let handlers = chain![authenticate, load_item, render_item];
/// ```
#[macro_export]
macro_rules! chain {
    () => {
        ::std::vec::Vec::<$crate::BoxedHandler>::new()
    };
    ($($handler:expr),+ $(,)?) => {
        ::std::vec![$($crate::into_handler($handler)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;

    struct Greeter {
        greeting: &'static str,
    }

    impl Handler for Greeter {
        fn handle(&self, ctx: &mut Context) -> HandlerResult {
            ctx.string(200, self.greeting)
        }
    }

    fn hello(ctx: &mut Context) -> HandlerResult {
        ctx.string(200, "hello")
    }

    #[test]
    fn test_fn_and_struct_handlers() {
        let mut ctx = Context::new(Request::default());

        into_handler(hello).handle(&mut ctx).unwrap();
        assert_eq!(ctx.take_response().unwrap().body, "hello");

        into_handler(Greeter { greeting: "hi" })
            .handle(&mut ctx)
            .unwrap();
        assert_eq!(ctx.take_response().unwrap().body, "hi");
    }

    #[test]
    fn test_chain_macro() {
        let empty = chain![];
        assert!(empty.is_empty());

        let handlers = chain![hello, |ctx: &mut Context| ctx.continue_chain(),];
        assert_eq!(handlers.len(), 2);
    }
}
