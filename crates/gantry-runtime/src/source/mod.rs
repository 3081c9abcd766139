//! Event sources: where raw proxy events come from and where responses go.

mod line;

pub use line::{LineSource, StdioSource, stdio};

use async_trait::async_trait;
use gantry_core::Response;

use crate::error::RuntimeResult;

/// A stream of raw proxy events paired with a response sink.
///
/// The runtime calls [`send_response`](Self::send_response) exactly once per
/// event returned by [`next_event`](Self::next_event), in the same order.
#[async_trait]
pub trait EventSource: Send {
    /// Returns the next raw event, or `None` once the source is exhausted.
    async fn next_event(&mut self) -> RuntimeResult<Option<Vec<u8>>>;

    /// Delivers the response for the most recent event.
    async fn send_response(&mut self, response: &Response) -> RuntimeResult<()>;
}

#[async_trait]
impl<S: EventSource + ?Sized> EventSource for &mut S {
    async fn next_event(&mut self) -> RuntimeResult<Option<Vec<u8>>> {
        (**self).next_event().await
    }

    async fn send_response(&mut self, response: &Response) -> RuntimeResult<()> {
        (**self).send_response(response).await
    }
}
