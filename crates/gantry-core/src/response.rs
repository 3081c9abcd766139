//! Outbound response model.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{HttpError, SerializationError, reason_phrase};
use crate::request::StringMap;

/// The value handed back to the event source.
///
/// `headers` is always serialized, as `{}` when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: StringMap,
    /// Serialized body.
    #[serde(default)]
    pub body: String,
}

impl Default for Response {
    fn default() -> Self {
        Self::no_content()
    }
}

impl Response {
    /// Creates a response with empty headers.
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            headers: StringMap::new(),
            body: body.into(),
        }
    }

    /// The response in effect before any handler acts: `204` with no body.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT.as_u16(), "")
    }

    /// The generic failure shown to callers when something unexpected happens.
    pub fn internal_error() -> Self {
        let code = StatusCode::INTERNAL_SERVER_ERROR.as_u16();
        Self::new(code, reason_phrase(code))
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Encodes the response envelope as JSON.
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encodes the response envelope as JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl From<HttpError> for Response {
    fn from(err: HttpError) -> Self {
        Self::new(err.code, err.message)
    }
}

impl From<&HttpError> for Response {
    fn from(err: &HttpError) -> Self {
        Self::new(err.code, err.message.clone())
    }
}
