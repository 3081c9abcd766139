//! Error types for the Gantry core.
//!
//! Two kinds of failure reach the chain boundary:
//!
//! - [`HttpError`]: raised on purpose by a handler to end the chain with a
//!   client-visible status and message.
//! - everything else, carried as [`HandlerError::Internal`]: the caller only
//!   ever sees a generic 500 while the detail goes to the operator log.
//!
//! [`HandlerError`] is the tagged type the executor matches on.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed error used for opaque handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// HttpError
// =============================================================================

/// An intentional error that maps 1:1 onto the outgoing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("code={code}, message={message}")]
pub struct HttpError {
    /// Status code of the response.
    pub code: u16,
    /// Body of the response.
    pub message: String,
}

impl HttpError {
    /// Creates an error with the given status code and message.
    ///
    /// An empty message falls back to the canonical reason phrase of the
    /// status code (`404` → `"Not Found"`).
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            reason_phrase(code).to_string()
        } else {
            message
        };
        Self { code, message }
    }

    /// Creates an error carrying only the reason phrase of `status`.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status.as_u16(), "")
    }

    /// `400 Bad Request` with a custom message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST.as_u16(), message)
    }

    /// `401 Unauthorized` with a custom message.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED.as_u16(), message)
    }

    /// `403 Forbidden` with a custom message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN.as_u16(), message)
    }

    /// `404 Not Found` with a custom message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND.as_u16(), message)
    }
}

/// Returns the canonical reason phrase for `code`, or `""` if unknown.
pub fn reason_phrase(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

// =============================================================================
// Context operation errors
// =============================================================================

/// Errors raised by [`Context::bind`](crate::Context::bind).
#[derive(Debug, Error)]
pub enum BindError {
    /// The body is not valid JSON.
    #[error("unable to bind body to struct: {0}")]
    InvalidBody(#[source] serde_json::Error),

    /// Query parameters were present but the body is not a JSON object.
    #[error("unable to bind query params to struct: body is a JSON {found}, not an object")]
    NotAnObject {
        /// The JSON kind the body decoded to.
        found: &'static str,
    },

    /// The merged value does not fit the target type.
    #[error("unable to bind request to struct: {0}")]
    Shape(#[source] serde_json::Error),
}

/// Error raised when a response body cannot be encoded as JSON.
#[derive(Debug, Error)]
#[error("unable to convert body to json: {0}")]
pub struct SerializationError(#[from] pub serde_json::Error);

/// Error raised when an inbound event envelope cannot be decoded.
#[derive(Debug, Error)]
#[error("unable to unmarshal event json: {0}")]
pub struct EnvelopeError(#[from] pub serde_json::Error);

// =============================================================================
// HandlerError
// =============================================================================

/// The error type returned by handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Intentional, client-visible failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Anything else. Never shown to the caller.
    #[error("{0}")]
    Internal(BoxError),
}

impl HandlerError {
    /// Wraps an arbitrary error as an internal failure.
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }

    /// Creates an internal failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Internal(message.into().into())
    }

    /// Returns the [`HttpError`] if this is an intentional failure.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            Self::Http(e) => Some(e),
            Self::Internal(_) => None,
        }
    }
}

impl From<BindError> for HandlerError {
    fn from(err: BindError) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<SerializationError> for HandlerError {
    fn from(err: SerializationError) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

/// Result type returned by handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Result type for [`Context::bind`](crate::Context::bind).
pub type BindResult<T> = Result<T, BindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_defaults_to_reason_phrase() {
        let err = HttpError::new(404, "");
        assert_eq!(err.message, "Not Found");

        let err = HttpError::new(418, "");
        assert_eq!(err.message, "I'm a teapot");
    }

    #[test]
    fn test_http_error_keeps_custom_message() {
        let err = HttpError::not_found("missing");
        assert_eq!(err.code, 404);
        assert_eq!(err.message, "missing");
        assert_eq!(err.to_string(), "code=404, message=missing");
    }

    #[test]
    fn test_unknown_status_has_empty_reason() {
        assert_eq!(reason_phrase(599), "");
        assert_eq!(HttpError::new(599, "").message, "");
    }

    #[test]
    fn test_handler_error_discriminant() {
        let http: HandlerError = HttpError::forbidden("nope").into();
        assert_eq!(http.as_http().map(|e| e.code), Some(403));

        let internal = HandlerError::msg("database on fire");
        assert!(internal.as_http().is_none());
        assert_eq!(internal.to_string(), "database on fire");
    }
}
