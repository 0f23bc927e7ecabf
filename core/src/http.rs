//! Transport-neutral request and response types.
//!
//! # Design
//! The coordinator describes every vault API call as a `DriverRequest` and
//! every answer as a `DriverResponse`. Drivers translate between these
//! values and their own HTTP machinery, so nothing above the driver layer
//! depends on a concrete HTTP library.
//!
//! Headers live in a `BTreeMap`: keys are unique, the last writer wins on
//! merge, and iteration order is deterministic.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde_json::Value;

use crate::error::TransportError;

/// Header name carrying the session token on authenticated calls.
pub const TOKEN_HEADER: &str = "X-Http-Token";

/// Request or driver-level headers, keyed by header name.
pub type Headers = BTreeMap<String, String>;

/// Ordered query parameters. Serialized in insertion order.
pub type QueryParams = Vec<(String, String)>;

/// HTTP method for a vault API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }
}

/// One request handed to a `RequestDriver`.
///
/// Built fresh by the coordinator for every call and never retained. `body`
/// is structured data; the driver decides whether it is worth sending (see
/// [`encode_body`]). `options` is the per-call layer of driver configuration.
#[derive(Debug, Clone)]
pub struct DriverRequest<O> {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<Value>,
    pub options: Option<O>,
}

/// The raw answer produced by a `RequestDriver`.
///
/// `handle` is whatever the driver keeps from its native response after the
/// body has been read (response parts, final URL, ...).
#[derive(Debug, Clone)]
pub struct DriverResponse<H> {
    pub status: u16,
    pub status_text: Option<String>,
    pub body: String,
    pub handle: H,
}

/// Merge the three header layers of a call.
///
/// Precedence, lowest first: driver base headers, per-call option headers,
/// explicit request headers. A higher layer overwrites a lower one when the
/// names match ignoring ASCII case; the higher layer's spelling is kept.
pub fn merge_headers(base: &Headers, call: Option<&Headers>, explicit: &Headers) -> Headers {
    let mut merged = Headers::new();
    overlay(&mut merged, base);
    if let Some(call) = call {
        overlay(&mut merged, call);
    }
    overlay(&mut merged, explicit);
    merged
}

fn overlay(merged: &mut Headers, layer: &Headers) {
    for (name, value) in layer {
        merged.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        merged.insert(name.clone(), value.clone());
    }
}

/// JSON-encode a request body, or return `None` when there is nothing to send.
///
/// Absent bodies, `null`, and empty objects or arrays are not attached to
/// the request at all.
pub fn encode_body(body: Option<&Value>) -> Result<Option<Bytes>, TransportError> {
    let Some(body) = body else {
        return Ok(None);
    };
    let empty = match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        return Ok(None);
    }
    let encoded = serde_json::to_vec(body)
        .map_err(|e| TransportError::InvalidRequest(format!("body encoding failed: {e}")))?;
    Ok(Some(Bytes::from(encoded)))
}

/// True if `headers` already carries `name`, compared case-insensitively.
pub fn has_header(headers: &Headers, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

/// Serialize query parameters into `key=value` pairs joined by `&`.
///
/// With `encode` unset, keys and values are concatenated verbatim, which is
/// what deployed vault servers expect. With `encode` set, both are
/// form-urlencoded.
pub fn serialize_query(params: &[(String, String)], encode: bool) -> String {
    if encode {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            serializer.append_pair(key, value);
        }
        return serializer.finish();
    }
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
