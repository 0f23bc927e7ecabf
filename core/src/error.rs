//! Error types for the vault API client.
//!
//! # Design
//! Only faults detected before a request leaves the client surface as `Err`:
//! a missing token or apikey, a payload that will not serialize, or a bad
//! configuration. Everything that happens on the wire, including transport
//! faults, comes back as an `ApiResponse` so callers inspect one shape.

use std::time::Duration;

/// Errors returned by `StoredSafeClient` before any network call is made.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The endpoint needs a session token and none is stored.
    #[error("path requires token, token is undefined")]
    AuthRequired,

    /// The endpoint needs an apikey and none was configured.
    #[error("path requires apikey, apikey is undefined")]
    ApiKeyRequired,

    /// The request payload could not be converted to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A transport-level fault raised by a `RequestDriver`.
///
/// HTTP error statuses are never reported through this type; a 4xx or 5xx
/// reply is a valid response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[cfg(not(target_arch = "wasm32"))]
    #[error("connection failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    #[cfg(not(target_arch = "wasm32"))]
    #[error("response body failed: {0}")]
    Body(#[from] hyper::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
