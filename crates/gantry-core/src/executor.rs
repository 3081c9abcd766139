//! Handler chain execution.
//!
//! Handlers run strictly in order against one shared [`Context`]:
//!
//! 1. An [`HttpError`](crate::HttpError) stops the chain and becomes the
//!    response as-is.
//! 2. Any other error stops the chain, is logged, and becomes a generic 500.
//! 3. A handler that succeeds and has set a response makes that response the
//!    current candidate. The chain keeps running.
//! 4. When every handler has succeeded the last candidate is returned, or the
//!    initial response if no handler set one.
//!
//! In short: the last response wins and the first error wins. Setting a
//! response does not short-circuit the chain.

use tracing::{Level, debug, error, span, trace};

use crate::context::Context;
use crate::error::HandlerError;
use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::Response;

/// Runs `handlers` against `ctx`, starting from `initial`.
pub fn execute(initial: Response, ctx: &mut Context, handlers: &[BoxedHandler]) -> Response {
    let mut current = initial;

    for (index, handler) in handlers.iter().enumerate() {
        trace!(handler_index = index, "Executing handler");

        match handler.handle(ctx) {
            Ok(()) => {
                if let Some(response) = ctx.take_response() {
                    current = response;
                }
            }
            Err(HandlerError::Http(err)) => {
                debug!(
                    handler_index = index,
                    code = err.code,
                    "Handler ended chain with HTTP error"
                );
                return Response::from(err);
            }
            Err(HandlerError::Internal(err)) => {
                error!(
                    handler_index = index,
                    error = %err,
                    "Error processing function handler"
                );
                return Response::internal_error();
            }
        }
    }

    current
}

/// Decodes a raw event and runs one handler chain for it, without routing.
///
/// A malformed envelope yields the generic 500 response.
pub fn handle_event(raw: &[u8], handlers: &[BoxedHandler]) -> Response {
    let Some(request) = decode_event(raw) else {
        return Response::internal_error();
    };

    let span = span!(
        Level::DEBUG,
        "invoke",
        request_id = %request.request_context.request_id,
        method = %request.http_method,
        resource = %request.resource,
    );
    let _enter = span.enter();

    let mut ctx = Context::new(request);
    execute(Response::no_content(), &mut ctx, handlers)
}

/// Decodes an event envelope, logging the failure if there is one.
pub(crate) fn decode_event(raw: &[u8]) -> Option<Request> {
    match Request::from_slice(raw) {
        Ok(request) => Some(request),
        Err(err) => {
            error!(error = %err, "Unable to decode event envelope");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain;
    use crate::error::{HandlerResult, HttpError};
    use crate::request::Request;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run(handlers: &[BoxedHandler]) -> Response {
        let mut ctx = Context::new(Request::default());
        execute(Response::no_content(), &mut ctx, handlers)
    }

    #[test]
    fn test_no_handlers_returns_initial() {
        let resp = run(&[]);
        assert_eq!(resp, Response::no_content());
    }

    #[test]
    fn test_handlers_that_set_nothing_return_initial() {
        let resp = run(&chain![|ctx: &mut Context| ctx.continue_chain()]);
        assert_eq!(resp.status_code, 204);
        assert!(resp.headers.is_empty());
    }

    // The chain does not stop once a response is set; the last one set wins.
    #[test]
    fn test_last_response_wins() {
        let resp = run(&chain![
            |ctx: &mut Context| ctx.string(200, "first"),
            |ctx: &mut Context| ctx.string(201, "second"),
        ]);
        assert_eq!(resp.status_code, 201);
        assert_eq!(resp.body, "second");
    }

    #[test]
    fn test_earlier_response_survives_silent_handler() {
        let resp = run(&chain![
            |ctx: &mut Context| ctx.string(200, "first"),
            |ctx: &mut Context| ctx.continue_chain(),
        ]);
        assert_eq!(resp.body, "first");
    }

    #[test]
    fn test_http_error_short_circuits() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);

        let resp = run(&chain![
            |_: &mut Context| -> HandlerResult { Err(HttpError::new(404, "missing").into()) },
            move |ctx: &mut Context| {
                ran_clone.fetch_add(1, Ordering::SeqCst);
                ctx.string(200, "unreachable")
            },
        ]);

        assert_eq!(resp.status_code, 404);
        assert_eq!(resp.body, "missing");
        assert!(resp.headers.is_empty());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_http_error_discards_earlier_response() {
        let resp = run(&chain![
            |ctx: &mut Context| ctx.string(200, "partial"),
            |_: &mut Context| -> HandlerResult { Err(HttpError::forbidden("").into()) },
        ]);
        assert_eq!(resp.status_code, 403);
        assert_eq!(resp.body, "Forbidden");
    }

    #[test]
    fn test_internal_error_is_generic() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);

        let resp = run(&chain![
            |_: &mut Context| -> HandlerResult {
                Err(HandlerError::msg("db password is hunter2"))
            },
            move |_: &mut Context| -> HandlerResult {
                ran_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        ]);

        assert_eq!(resp, Response::internal_error());
        assert!(!resp.body.contains("hunter2"));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unpropagated_bind_error_is_internal() {
        let mut ctx = Context::new(Request::builder().body("not json").build());
        let resp = execute(
            Response::no_content(),
            &mut ctx,
            &chain![|ctx: &mut Context| -> HandlerResult {
                let _: serde_json::Value = ctx.bind()?;
                ctx.string(200, "bound")
            }],
        );
        assert_eq!(resp.status_code, 500);
        assert_eq!(resp.body, "Internal Server Error");
    }

    #[test]
    fn test_handle_event_runs_chain_without_routing() {
        let handlers = chain![|ctx: &mut Context| {
            let who = ctx.query_param("name").to_string();
            ctx.string(200, format!("hello {who}"))
        }];

        let raw = br#"{"httpMethod":"GET","resource":"/anything","queryStringParameters":{"name":"ada"}}"#;
        let resp = handle_event(raw, &handlers);
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body, "hello ada");
    }

    #[test]
    fn test_handle_event_malformed_envelope() {
        let handlers = chain![|ctx: &mut Context| ctx.string(200, "never")];
        let resp = handle_event(b"{oops", &handlers);
        assert_eq!(resp, Response::internal_error());
    }
}
