//! Fetch-style driver built on `reqwest`.
//!
//! One asynchronous call per request: merged headers, method and (optional)
//! body go out together, and the whole response text is awaited before the
//! driver returns. On `wasm32` targets reqwest delegates to the browser's
//! `fetch`, which makes this the browser default.

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use super::RequestDriver;
use crate::error::TransportError;
use crate::http::{encode_body, has_header, merge_headers, DriverRequest, DriverResponse, Headers};

/// Configuration for `FetchDriver`, used both as the driver's base init and
/// as the per-call override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub headers: Headers,
    /// Ignored on `wasm32`, where the browser owns timeouts.
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Parts of the `reqwest::Response` kept after its text has been read.
#[derive(Debug, Clone)]
pub struct FetchHandle {
    pub url: reqwest::Url,
    pub version: http::Version,
    pub headers: http::HeaderMap,
}

#[derive(Debug, Clone)]
pub struct FetchDriver {
    client: reqwest::Client,
    base: FetchOptions,
}

impl Default for FetchDriver {
    fn default() -> Self {
        Self::new(FetchOptions::default())
    }
}

impl FetchDriver {
    pub fn new(base: FetchOptions) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Use a preconfigured `reqwest::Client` (proxy, client certificate, ...).
    pub fn with_client(client: reqwest::Client, base: FetchOptions) -> Self {
        Self { client, base }
    }

    pub fn base(&self) -> &FetchOptions {
        &self.base
    }

    /// Merge base and per-call options and build the `reqwest::Request`.
    pub(crate) fn build_request(
        &self,
        request: DriverRequest<FetchOptions>,
    ) -> Result<reqwest::Request, TransportError> {
        let call = request.options.as_ref();
        let mut headers = merge_headers(
            &self.base.headers,
            call.map(|o| &o.headers),
            &request.headers,
        );
        let body = encode_body(request.body.as_ref())?;
        if body.is_some() && !has_header(&headers, "content-type") {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }

        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = call.and_then(|o| o.timeout).or(self.base.timeout) {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

#[async_trait]
impl RequestDriver for FetchDriver {
    type Options = FetchOptions;
    type Handle = FetchHandle;

    async fn request(
        &self,
        request: DriverRequest<FetchOptions>,
    ) -> Result<DriverResponse<FetchHandle>, TransportError> {
        let prepared = self.build_request(request)?;
        let response = self.client.execute(prepared).await?;

        let status = response.status();
        let handle = FetchHandle {
            url: response.url().clone(),
            version: response.version(),
            headers: response.headers().clone(),
        };
        let body = response.text().await?;
        trace!(status = status.as_u16(), bytes = body.len(), "fetch response read");

        Ok(DriverResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().map(str::to_string),
            body,
            handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use serde_json::json;

    fn request(body: Option<serde_json::Value>, options: Option<FetchOptions>) -> DriverRequest<FetchOptions> {
        DriverRequest {
            url: "https://example.com/api/1.0/vault".to_string(),
            method: HttpMethod::Post,
            headers: Headers::new(),
            body,
            options,
        }
    }

    fn header<'a>(req: &'a reqwest::Request, name: &str) -> Option<&'a str> {
        req.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn empty_body_is_not_attached() {
        let driver = FetchDriver::default();
        let built = driver.build_request(request(Some(json!({})), None)).unwrap();
        assert!(built.body().is_none());
        assert!(header(&built, "content-type").is_none());

        let built = driver.build_request(request(None, None)).unwrap();
        assert!(built.body().is_none());
    }

    #[test]
    fn non_empty_body_is_json_encoded() {
        let driver = FetchDriver::default();
        let built = driver
            .build_request(request(Some(json!({"name": "newname"})), None))
            .unwrap();
        let bytes = built.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(bytes, br#"{"name":"newname"}"#);
        assert_eq!(header(&built, "content-type"), Some("application/json"));
    }

    #[test]
    fn headers_merge_across_three_layers() {
        let driver = FetchDriver::new(
            FetchOptions::default()
                .header("x-init-header", "value")
                .header("x-common-header", "base"),
        );
        let call = FetchOptions::default()
            .header("x-request-header", "value")
            .header("x-common-header", "request");
        let mut req = request(None, Some(call));
        req.headers
            .insert("x-headers-header".to_string(), "value".to_string());
        req.headers
            .insert("x-common-header".to_string(), "headers".to_string());

        let built = driver.build_request(req).unwrap();
        assert_eq!(header(&built, "x-init-header"), Some("value"));
        assert_eq!(header(&built, "x-request-header"), Some("value"));
        assert_eq!(header(&built, "x-headers-header"), Some("value"));
        assert_eq!(header(&built, "x-common-header"), Some("headers"));
    }

    #[test]
    fn explicit_header_replaces_base_header_of_other_case() {
        let driver = FetchDriver::new(FetchOptions::default().header("x-http-token", "base-token"));
        let mut req = request(None, None);
        req.headers
            .insert("X-Http-Token".to_string(), "session-token".to_string());

        let built = driver.build_request(req).unwrap();
        let values: Vec<_> = built.headers().get_all("x-http-token").iter().collect();
        assert_eq!(values, vec!["session-token"]);
    }

    #[test]
    fn call_timeout_overrides_base() {
        let driver = FetchDriver::new(FetchOptions::default().timeout(Duration::from_secs(30)));
        let built = driver.build_request(request(None, None)).unwrap();
        assert_eq!(built.timeout(), Some(&Duration::from_secs(30)));

        let call = FetchOptions::default().timeout(Duration::from_secs(2));
        let built = driver.build_request(request(None, Some(call))).unwrap();
        assert_eq!(built.timeout(), Some(&Duration::from_secs(2)));
    }

    #[test]
    fn method_and_url_are_preserved() {
        let driver = FetchDriver::default();
        let built = driver.build_request(request(None, None)).unwrap();
        assert_eq!(built.method(), &http::Method::POST);
        assert_eq!(built.url().as_str(), "https://example.com/api/1.0/vault");
    }
}
