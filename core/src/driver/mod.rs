//! Pluggable request transport.
//!
//! # Design
//! `StoredSafeClient` never talks to an HTTP library directly. It hands a
//! [`DriverRequest`] to a [`RequestDriver`] and gets a [`DriverResponse`]
//! back. Each driver owns its base configuration (`Options`) and keeps a
//! driver-specific `Handle` from the native response.
//!
//! Drivers must return `Ok` for every HTTP status, including 4xx and 5xx,
//! and reserve `Err` for faults where no response was received.
//!
//! Implementations:
//! - [`fetch::FetchDriver`]: one `reqwest` call, text body awaited whole.
//!   On `wasm32` this is the browser `fetch`.
//! - [`stream::StreamDriver`]: `hyper` over a rustls socket, body written
//!   before the request ends and response frames accumulated (native only).
//! - [`replay::ReplayDriver`]: canned responses for tests.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{DriverRequest, DriverResponse};

pub mod fetch;
pub mod replay;
#[cfg(not(target_arch = "wasm32"))]
pub mod stream;

/// Driver used by `StoredSafeClient::new` on server targets.
#[cfg(not(target_arch = "wasm32"))]
pub type DefaultDriver = stream::StreamDriver;

/// Driver used by `StoredSafeClient::new` in the browser.
#[cfg(target_arch = "wasm32")]
pub type DefaultDriver = fetch::FetchDriver;

/// Executes one HTTP request on behalf of the coordinator.
///
/// Must be safe to call concurrently: every call carries its own
/// `DriverRequest` and shares no per-call state.
#[async_trait]
pub trait RequestDriver: Send + Sync {
    /// Driver configuration. The driver holds a base value; a request may
    /// carry another one that overrides it field by field.
    type Options: Clone + Send + Sync + 'static;

    /// What the driver keeps from its native response.
    type Handle: Send + fmt::Debug + 'static;

    async fn request(
        &self,
        request: DriverRequest<Self::Options>,
    ) -> Result<DriverResponse<Self::Handle>, TransportError>;
}

#[async_trait]
impl<D: RequestDriver + ?Sized> RequestDriver for Arc<D> {
    type Options = D::Options;
    type Handle = D::Handle;

    async fn request(
        &self,
        request: DriverRequest<Self::Options>,
    ) -> Result<DriverResponse<Self::Handle>, TransportError> {
        (**self).request(request).await
    }
}
