//! Inbound proxy-event model.
//!
//! A [`Request`] is decoded once per invocation from the event envelope and is
//! read-only afterwards. Every field is optional on the wire; absent or
//! `null` values decode to empty strings and empty maps so handlers never have
//! to deal with missing data.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::EnvelopeError;

/// String-to-string map used for headers, parameters and stage variables.
pub type StringMap = HashMap<String, String>;

/// Decodes `null` as the type's default instead of failing.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A parsed proxy request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Request {
    /// Gateway metadata, passed through untouched.
    #[serde(deserialize_with = "null_as_default")]
    pub request_context: RequestContext,
    /// HTTP method, as sent by the client.
    #[serde(deserialize_with = "null_as_default")]
    pub http_method: String,
    /// Concrete request path.
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    /// Resource template that matched, e.g. `/items/{id}`.
    #[serde(deserialize_with = "null_as_default")]
    pub resource: String,
    #[serde(deserialize_with = "null_as_default")]
    pub headers: StringMap,
    #[serde(deserialize_with = "null_as_default")]
    pub query_string_parameters: StringMap,
    #[serde(deserialize_with = "null_as_default")]
    pub path_parameters: StringMap,
    #[serde(deserialize_with = "null_as_default")]
    pub stage_variables: StringMap,
    /// Raw body as delivered by the gateway.
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
}

impl Request {
    /// Decodes an event envelope from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decodes an event envelope from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Starts building a request in code.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }
}

/// Gateway request metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestContext {
    #[serde(deserialize_with = "null_as_default")]
    pub resource_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub api_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub resource_path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub http_method: String,
    #[serde(deserialize_with = "null_as_default")]
    pub request_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub account_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub identity: Identity,
    #[serde(deserialize_with = "null_as_default")]
    pub stage: String,
}

/// Caller identity as reported by the gateway. Never interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    #[serde(deserialize_with = "null_as_default")]
    pub api_key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_arn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cognito_authentication_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub caller: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_agent: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cognito_identity_pool_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cognito_identity_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cognito_authentication_provider: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source_ip: String,
    #[serde(deserialize_with = "null_as_default")]
    pub account_id: String,
}

// =============================================================================
// RequestBuilder
// =============================================================================

/// Builder for [`Request`] values constructed in code.
///
/// ```rust,ignore
/// let req = Request::builder()
///     .method("POST")
///     .resource("/items")
///     .query("dry_run", "true")
///     .body(r#"{"name":"widget"}"#)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct RequestBuilder {
    inner: Request,
}

impl RequestBuilder {
    /// Sets the HTTP method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.inner.http_method = method.into();
        self
    }

    /// Sets the concrete path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner.path = path.into();
        self
    }

    /// Sets the resource template used for routing.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.inner.resource = resource.into();
        self
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a query-string parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .query_string_parameters
            .insert(name.into(), value.into());
        self
    }

    /// Adds a path parameter.
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.path_parameters.insert(name.into(), value.into());
        self
    }

    /// Adds a stage variable.
    pub fn stage_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.stage_variables.insert(name.into(), value.into());
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.inner.body = body.into();
        self
    }

    /// Sets the gateway request id.
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.inner.request_context.request_id = id.into();
        self
    }

    /// Finishes the request.
    pub fn build(self) -> Request {
        self.inner
    }
}
