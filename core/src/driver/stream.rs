//! Stream-socket driver built on `hyper`.
//!
//! Requests go out over a rustls socket (plain TCP for `http://` URLs).
//! A JSON body is written only when there is something to send; otherwise
//! the request is ended without any body write. Response data frames are
//! accumulated into one body as they arrive.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Either, Empty, Full};
use hyper::body::Body;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::trace;

use super::RequestDriver;
use crate::error::TransportError;
use crate::http::{encode_body, has_header, merge_headers, DriverRequest, DriverResponse, Headers};

/// Request body: nothing at all, or exactly one JSON payload.
pub type RequestBody = Either<Empty<Bytes>, Full<Bytes>>;

type HttpsClient = Client<HttpsConnector<HttpConnector>, RequestBody>;

/// Configuration for `StreamDriver`, used both as the driver's base request
/// options and as the per-call override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    pub headers: Headers,
    /// Bound on the whole exchange, body included.
    pub timeout: Option<Duration>,
}

impl StreamOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct StreamDriver {
    client: HttpsClient,
    base: StreamOptions,
}

impl Default for StreamDriver {
    fn default() -> Self {
        Self::new(StreamOptions::default())
    }
}

impl StreamDriver {
    /// Driver trusting the bundled webpki roots, without a client certificate.
    pub fn new(base: StreamOptions) -> Self {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        Self::with_connector(connector, base)
    }

    /// Driver on a caller-built rustls configuration: a private CA, or a
    /// client certificate for the mutual-TLS login port.
    pub fn with_tls_config(tls: rustls::ClientConfig, base: StreamOptions) -> Self {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .build();
        Self::with_connector(connector, base)
    }

    pub fn with_connector(connector: HttpsConnector<HttpConnector>, base: StreamOptions) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, base }
    }

    pub fn base(&self) -> &StreamOptions {
        &self.base
    }

    /// Merge base and per-call options and build the `http::Request`.
    ///
    /// Returns the effective timeout alongside the request.
    pub(crate) fn build_request(
        &self,
        request: DriverRequest<StreamOptions>,
    ) -> Result<(http::Request<RequestBody>, Option<Duration>), TransportError> {
        let call = request.options.as_ref();
        let timeout = call.and_then(|o| o.timeout).or(self.base.timeout);
        let mut headers = merge_headers(
            &self.base.headers,
            call.map(|o| &o.headers),
            &request.headers,
        );
        let payload = encode_body(request.body.as_ref())?;
        if payload.is_some() && !has_header(&headers, "content-type") {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }

        let mut builder = http::Request::builder()
            .method(http::Method::from(request.method))
            .uri(request.url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = match payload {
            Some(bytes) => Either::Right(Full::new(bytes)),
            None => Either::Left(Empty::new()),
        };
        let built = builder
            .body(body)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok((built, timeout))
    }

    async fn exchange(
        &self,
        request: http::Request<RequestBody>,
    ) -> Result<DriverResponse<http::response::Parts>, TransportError> {
        let response = self.client.request(request).await?;
        let (parts, body) = response.into_parts();
        let bytes = accumulate(body).await?;
        Ok(DriverResponse {
            status: parts.status.as_u16(),
            status_text: status_text(&parts),
            body: String::from_utf8_lossy(&bytes).into_owned(),
            handle: parts,
        })
    }
}

/// Reason phrase as sent by the server. hyper records it only when it
/// differs from the canonical one.
fn status_text(parts: &http::response::Parts) -> Option<String> {
    parts
        .extensions
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
        .or_else(|| parts.status.canonical_reason())
        .map(str::to_string)
}

/// Collect every data frame of `body` into one buffer. Trailer frames are
/// skipped.
pub(crate) async fn accumulate<B>(mut body: B) -> Result<Vec<u8>, B::Error>
where
    B: Body<Data = Bytes> + Unpin,
{
    let mut buf = Vec::new();
    while let Some(frame) = body.frame().await {
        if let Ok(chunk) = frame?.into_data() {
            trace!(len = chunk.len(), "response frame");
            buf.extend_from_slice(&chunk);
        }
    }
    Ok(buf)
}

#[async_trait]
impl RequestDriver for StreamDriver {
    type Options = StreamOptions;
    type Handle = http::response::Parts;

    async fn request(
        &self,
        request: DriverRequest<StreamOptions>,
    ) -> Result<DriverResponse<http::response::Parts>, TransportError> {
        let (prepared, timeout) = self.build_request(request)?;
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(prepared))
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => self.exchange(prepared).await,
        }
    }
}
