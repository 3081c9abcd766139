//! Per-invocation execution context.
//!
//! A [`Context`] is created for every dispatched request and handed, by
//! mutable reference, to each handler of the chain in turn. Handlers read the
//! request through the accessor methods and produce output by setting the
//! context's response:
//!
//! ```rust,ignore
//! fn show_item(ctx: &mut Context) -> HandlerResult {
//!     let id = ctx.path_param("id").to_string();
//!     if id.is_empty() {
//!         return Err(HttpError::bad_request("missing id").into());
//!     }
//!     ctx.json(200, &serde_json::json!({ "id": id }))
//! }
//! ```
//!
//! Setting a response never ends the chain. A later handler may overwrite it
//! and the executor keeps whichever was set last.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::{BindError, BindResult, HandlerResult, SerializationError};
use crate::request::{Request, StringMap};
use crate::response::Response;

/// Carrier of the request and the in-progress response for one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Context {
    request: Request,
    response: Option<Response>,
}

impl Context {
    /// Creates a context for `request` with no response set.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: None,
        }
    }

    /// Returns the request being handled.
    pub fn request(&self) -> &Request {
        &self.request
    }

    // ─── Accessors ────────────────────────────────────────────────────────────

    /// Returns a query-string parameter, or `""` if absent.
    pub fn query_param(&self, name: &str) -> &str {
        lookup(&self.request.query_string_parameters, name)
    }

    /// Returns a path parameter, or `""` if absent.
    pub fn path_param(&self, name: &str) -> &str {
        lookup(&self.request.path_parameters, name)
    }

    /// Returns a stage variable, or `""` if absent.
    pub fn stage_var(&self, name: &str) -> &str {
        lookup(&self.request.stage_variables, name)
    }

    /// Returns a header, or `""` if absent.
    ///
    /// An exact match is preferred. Otherwise, among the headers whose name
    /// matches ignoring ASCII case, the one with the smallest name wins.
    pub fn header(&self, name: &str) -> &str {
        let headers = &self.request.headers;
        if let Some(value) = headers.get(name) {
            return value;
        }
        headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Deserializes the body into `T`, with query parameters laid over it.
    ///
    /// The body must be JSON. Query parameters replace body fields of the same
    /// name; fields only present in one of the two are kept. A query value
    /// replacing a body number or boolean is parsed as that type when it can
    /// be. A query-only value is read as an integer, float or boolean when it
    /// looks like one; if `T` rejects that, binding is retried with every
    /// query-only value kept as a string.
    pub fn bind<T: DeserializeOwned>(&self) -> BindResult<T> {
        let body: Value =
            serde_json::from_str(&self.request.body).map_err(BindError::InvalidBody)?;
        let query = &self.request.query_string_parameters;

        let mut typed = body.clone();
        overlay_query(&mut typed, query, QueryOnly::Infer)?;
        let err = match serde_json::from_value(typed) {
            Ok(bound) => return Ok(bound),
            Err(err) if query.is_empty() => return Err(BindError::Shape(err)),
            Err(err) => err,
        };

        let mut plain = body;
        overlay_query(&mut plain, query, QueryOnly::Text)?;
        serde_json::from_value(plain).map_err(|_| BindError::Shape(err))
    }

    // ─── Response setters ─────────────────────────────────────────────────────

    /// Sets an empty-bodied response with the given status.
    pub fn no_content(&mut self, status: u16) -> HandlerResult {
        self.set_response(Response::new(status, ""));
        Ok(())
    }

    /// Sets a response whose body is `body`, unchanged.
    pub fn string(&mut self, status: u16, body: impl Into<String>) -> HandlerResult {
        self.set_response(Response::new(status, body));
        Ok(())
    }

    /// Sets a response whose body is `body` encoded as JSON.
    ///
    /// Fails with a [`SerializationError`] (as an internal handler error) when
    /// `body` cannot be encoded; the current response is left untouched.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: u16, body: &T) -> HandlerResult {
        let encoded = serde_json::to_string(body).map_err(SerializationError)?;
        self.set_response(Response::new(status, encoded));
        Ok(())
    }

    /// Lets the next handler run without producing anything.
    pub fn continue_chain(&self) -> HandlerResult {
        Ok(())
    }

    fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    /// Removes and returns the response set by the last handler, if any.
    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Renders the context as pretty JSON for diagnostics.
    pub fn dump(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn lookup<'a>(map: &'a StringMap, name: &str) -> &'a str {
    map.get(name).map(String::as_str).unwrap_or("")
}

/// How a query value with no counterpart in the body is typed.
#[derive(Clone, Copy)]
enum QueryOnly {
    Infer,
    Text,
}

fn overlay_query(target: &mut Value, query: &StringMap, mode: QueryOnly) -> BindResult<()> {
    if query.is_empty() {
        return Ok(());
    }
    let Value::Object(fields) = target else {
        return Err(BindError::NotAnObject {
            found: json_kind(target),
        });
    };
    overlay_fields(fields, query, mode);
    Ok(())
}

fn overlay_fields(fields: &mut Map<String, Value>, query: &StringMap, mode: QueryOnly) {
    for (name, raw) in query {
        let value = match (fields.get(name), mode) {
            (Some(existing), _) => coerce_like(existing, raw),
            (None, QueryOnly::Infer) => infer_scalar(raw),
            (None, QueryOnly::Text) => Value::String(raw.clone()),
        };
        fields.insert(name.clone(), value);
    }
}

/// Reads `raw` as an integer, float or boolean, falling back to a string.
fn infer_scalar(raw: &str) -> Value {
    parse_number(raw)
        .or_else(|| raw.parse::<bool>().ok().map(Value::Bool))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn parse_number(raw: &str) -> Option<Value> {
    raw.parse::<i64>()
        .ok()
        .map(Value::from)
        .or_else(|| raw.parse::<u64>().ok().map(Value::from))
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        })
}

/// Parses `raw` as the scalar type of `existing`, falling back to a string.
fn coerce_like(existing: &Value, raw: &str) -> Value {
    let parsed = match existing {
        Value::Bool(_) => raw.parse::<bool>().ok().map(Value::Bool),
        Value::Number(_) => parse_number(raw),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use serde::Deserialize;
    use std::collections::HashMap;

    fn ctx(req: Request) -> Context {
        Context::new(req)
    }

    #[test]
    fn test_accessors_return_empty_when_absent() {
        let c = ctx(Request::default());
        assert_eq!(c.query_param("q"), "");
        assert_eq!(c.path_param("id"), "");
        assert_eq!(c.stage_var("table"), "");
        assert_eq!(c.header("Accept"), "");
    }

    #[test]
    fn test_accessors_read_request_maps() {
        let c = ctx(Request::builder()
            .query("q", "lamp")
            .path_param("id", "9")
            .stage_var("table", "items")
            .header("Content-Type", "application/json")
            .build());

        assert_eq!(c.query_param("q"), "lamp");
        assert_eq!(c.path_param("id"), "9");
        assert_eq!(c.stage_var("table"), "items");
        assert_eq!(c.header("Content-Type"), "application/json");
        assert_eq!(c.header("content-type"), "application/json");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Search {
        term: String,
        limit: u32,
        #[serde(default)]
        exact: bool,
        #[serde(default)]
        sort: Option<String>,
    }

    #[test]
    fn test_bind_overlays_query_on_body() {
        let c = ctx(Request::builder()
            .body(r#"{"term":"lamp","limit":10,"exact":false}"#)
            .query("limit", "25")
            .query("exact", "true")
            .query("sort", "price")
            .build());

        let search: Search = c.bind().unwrap();
        assert_eq!(
            search,
            Search {
                term: "lamp".into(),
                limit: 25,
                exact: true,
                sort: Some("price".into()),
            }
        );
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Page {
        term: String,
        limit: u32,
        #[serde(default)]
        ratio: Option<f64>,
        #[serde(default)]
        exact: bool,
    }

    #[test]
    fn test_bind_types_query_only_fields() {
        let c = ctx(Request::builder()
            .body(r#"{"term":"lamp"}"#)
            .query("limit", "5")
            .query("ratio", "0.5")
            .query("exact", "true")
            .build());

        let page: Page = c.bind().unwrap();
        assert_eq!(
            page,
            Page {
                term: "lamp".into(),
                limit: 5,
                ratio: Some(0.5),
                exact: true,
            }
        );
    }

    #[test]
    fn test_bind_query_only_same_with_or_without_body_field() {
        let without = ctx(Request::builder()
            .body(r#"{"term":"lamp"}"#)
            .query("limit", "5")
            .build());
        let with = ctx(Request::builder()
            .body(r#"{"term":"lamp","limit":1}"#)
            .query("limit", "5")
            .build());

        assert_eq!(without.bind::<Page>().unwrap().limit, 5);
        assert_eq!(with.bind::<Page>().unwrap().limit, 5);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Lookup {
        code: String,
        flag: String,
    }

    #[test]
    fn test_bind_keeps_numeric_looking_query_for_string_field() {
        let c = ctx(Request::builder()
            .body("{}")
            .query("code", "007")
            .query("flag", "true")
            .build());

        let lookup: Lookup = c.bind().unwrap();
        assert_eq!(lookup.code, "007");
        assert_eq!(lookup.flag, "true");
    }

    #[test]
    fn test_bind_query_only_mismatch_is_shape_error() {
        let c = ctx(Request::builder()
            .body(r#"{"term":"lamp"}"#)
            .query("limit", "lots")
            .build());
        assert!(matches!(c.bind::<Page>(), Err(BindError::Shape(_))));
    }

    #[test]
    fn test_header_case_variants_resolve_deterministically() {
        let c = ctx(Request::builder()
            .header("x-key", "lower")
            .header("X-Key", "title")
            .header("X-KEY", "upper")
            .build());

        assert_eq!(c.header("x-key"), "lower");
        assert_eq!(c.header("X-kEy"), "upper");
    }

    #[test]
    fn test_bind_keeps_body_fields_without_query() {
        let c = ctx(Request::builder()
            .body(r#"{"term":"desk","limit":3}"#)
            .build());

        let search: Search = c.bind().unwrap();
        assert_eq!(search.term, "desk");
        assert_eq!(search.limit, 3);
        assert_eq!(search.sort, None);
    }

    #[test]
    fn test_bind_rejects_invalid_body() {
        let c = ctx(Request::builder().body("term=lamp").build());
        let err = c.bind::<Search>().unwrap_err();
        assert!(matches!(err, BindError::InvalidBody(_)));
    }

    #[test]
    fn test_bind_rejects_empty_body() {
        let c = ctx(Request::builder().query("term", "lamp").build());
        assert!(matches!(
            c.bind::<Search>(),
            Err(BindError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_bind_rejects_non_object_body_with_query() {
        let c = ctx(Request::builder().body("[1,2]").query("limit", "1").build());
        assert!(matches!(
            c.bind::<Vec<u32>>(),
            Err(BindError::NotAnObject { found: "array" })
        ));
    }

    #[test]
    fn test_bind_shape_mismatch() {
        let c = ctx(Request::builder()
            .body(r#"{"term":"lamp","limit":10}"#)
            .query("limit", "many")
            .build());
        assert!(matches!(c.bind::<Search>(), Err(BindError::Shape(_))));
    }

    #[test]
    fn test_setters_overwrite_previous_response() {
        let mut c = ctx(Request::default());
        c.string(200, "first").unwrap();
        c.json(201, &serde_json::json!({ "ok": true })).unwrap();

        let resp = c.take_response().unwrap();
        assert_eq!(resp.status_code, 201);
        assert_eq!(resp.body, r#"{"ok":true}"#);
        assert!(resp.headers.is_empty());
    }

    #[test]
    fn test_string_body_is_raw() {
        let mut c = ctx(Request::default());
        c.string(200, "hello \"world\"").unwrap();
        assert_eq!(c.take_response().unwrap().body, "hello \"world\"");
    }

    #[test]
    fn test_no_content_body_is_empty() {
        let mut c = ctx(Request::default());
        c.no_content(202).unwrap();
        let resp = c.take_response().unwrap();
        assert_eq!(resp.status_code, 202);
        assert_eq!(resp.body, "");
    }

    #[test]
    fn test_json_serialization_failure_keeps_response() {
        let mut c = ctx(Request::default());
        c.string(200, "kept").unwrap();

        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys are not valid JSON object keys");

        let err = c.json(200, &bad).unwrap_err();
        match err {
            HandlerError::Internal(e) => assert!(e.downcast_ref::<SerializationError>().is_some()),
            HandlerError::Http(_) => panic!("expected an internal error"),
        }
        assert_eq!(c.take_response().unwrap().body, "kept");
    }

    #[test]
    fn test_continue_chain_sets_nothing() {
        let mut c = ctx(Request::default());
        c.continue_chain().unwrap();
        assert!(c.take_response().is_none());
    }

    #[test]
    fn test_dump_includes_request_and_response() {
        let mut c = ctx(Request::builder().method("GET").resource("/x").build());
        let before: Value = serde_json::from_str(&c.dump().unwrap()).unwrap();
        assert_eq!(before["request"]["httpMethod"], "GET");
        assert!(before["response"].is_null());

        c.no_content(404).unwrap();
        let after: Value = serde_json::from_str(&c.dump().unwrap()).unwrap();
        assert_eq!(after["response"]["statusCode"], 404);
    }
}
