//! Request coordinator for the vault API.
//!
//! # Design
//! `StoredSafeClient` owns the `Session` (host, API version, apikey, token)
//! and exactly one `RequestDriver`. Each verb helper builds the absolute URL,
//! hands a `DriverRequest` to the driver and normalizes what comes back into
//! an `ApiResponse`. Endpoint methods (see `endpoints.rs`) sit on top and
//! only describe path, query and body.
//!
//! The token changes in two places only: `store_token` after a login and
//! `clear_token` after a logout. Both take `&mut self`, so every other call
//! can share the client by reference.

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, Scheme};
use crate::driver::{DefaultDriver, RequestDriver};
use crate::error::ApiError;
use crate::http::{serialize_query, DriverRequest, Headers, HttpMethod, QueryParams, TOKEN_HEADER};
use crate::response::ApiResponse;

/// Connection and credential state of one client.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub host: String,
    pub api_version: String,
    pub apikey: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .field("apikey", &self.apikey.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything a verb helper needs besides method and path.
///
/// `options` is the per-call driver configuration; it overrides the
/// driver's base options and is itself overridden by `headers`.
#[derive(Debug, Clone)]
pub struct RequestParams<O> {
    pub headers: Headers,
    pub query: QueryParams,
    pub body: Option<Value>,
    pub options: Option<O>,
    /// Send to the mutual-TLS port instead of the default API port.
    pub mtls: bool,
}

impl<O> Default for RequestParams<O> {
    fn default() -> Self {
        Self {
            headers: Headers::new(),
            query: QueryParams::new(),
            body: None,
            options: None,
            mtls: false,
        }
    }
}

impl<O> RequestParams<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn options(mut self, options: O) -> Self {
        self.options = Some(options);
        self
    }

    pub fn mtls(mut self) -> Self {
        self.mtls = true;
        self
    }
}

/// Typed client for the vault API.
pub struct StoredSafeClient<D: RequestDriver = DefaultDriver> {
    session: Session,
    scheme: Scheme,
    mtls_port: u16,
    encode_query: bool,
    driver: D,
}

impl StoredSafeClient<DefaultDriver> {
    /// Build a client on the default driver for this target.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::with_driver(config, DefaultDriver::default())
    }
}

impl<D: RequestDriver> StoredSafeClient<D> {
    pub fn with_driver(config: ClientConfig, driver: D) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self {
            session: Session {
                host: config.host.trim().to_string(),
                api_version: config.api_version,
                apikey: config.apikey,
                token: config.token,
            },
            scheme: config.scheme,
            mtls_port: config.mtls_port,
            encode_query: config.encode_query,
            driver,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    pub fn apikey(&self) -> Option<&str> {
        self.session.apikey.as_deref()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Build the absolute URL for `path`.
    ///
    /// A leading `/` on `path` is ignored. The query string is appended only
    /// when there are parameters.
    pub fn url(&self, path: &str, query: &[(String, String)], mtls: bool) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        let host = if mtls {
            format!("{}:{}", self.session.host, self.mtls_port)
        } else {
            self.session.host.clone()
        };
        let mut url = format!(
            "{}://{}/api/{}/{}",
            self.scheme.as_str(),
            host,
            self.session.api_version,
            path
        );
        let query = serialize_query(query, self.encode_query);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    pub async fn get(&self, path: &str, params: RequestParams<D::Options>) -> ApiResponse<Value, D::Handle> {
        self.request(HttpMethod::Get, path, params).await
    }

    /// POST without a body sends an empty object, which drivers leave off
    /// the wire.
    pub async fn post(&self, path: &str, mut params: RequestParams<D::Options>) -> ApiResponse<Value, D::Handle> {
        params.body.get_or_insert_with(empty_object);
        self.request(HttpMethod::Post, path, params).await
    }

    pub async fn put(&self, path: &str, mut params: RequestParams<D::Options>) -> ApiResponse<Value, D::Handle> {
        params.body.get_or_insert_with(empty_object);
        self.request(HttpMethod::Put, path, params).await
    }

    pub async fn delete(&self, path: &str, params: RequestParams<D::Options>) -> ApiResponse<Value, D::Handle> {
        self.request(HttpMethod::Delete, path, params).await
    }

    /// Execute one call. Never retries; transport faults are folded into
    /// the returned result.
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: RequestParams<D::Options>,
    ) -> ApiResponse<Value, D::Handle> {
        let RequestParams {
            headers,
            query,
            body,
            options,
            mtls,
        } = params;
        let url = self.url(path, &query, mtls);
        debug!(%method, %url, "vault api request");

        let request = DriverRequest {
            url,
            method,
            headers,
            body,
            options,
        };
        match self.driver.request(request).await {
            Ok(response) => {
                let result = ApiResponse::from_driver(response);
                debug!(
                    status = result.status,
                    outcome = ?result.outcome,
                    "vault api response"
                );
                result
            }
            Err(e) => {
                warn!(%method, path, error = %e, "transport failure");
                ApiResponse::from_transport_error(&e)
            }
        }
    }

    /// Headers for a call that needs a session token.
    pub(crate) fn auth_headers(&self) -> Result<Headers, ApiError> {
        let token = self.session.token.as_ref().ok_or(ApiError::AuthRequired)?;
        let mut headers = Headers::new();
        headers.insert(TOKEN_HEADER.to_string(), token.clone());
        Ok(headers)
    }

    pub(crate) fn require_apikey(&self) -> Result<&str, ApiError> {
        self.session.apikey.as_deref().ok_or(ApiError::ApiKeyRequired)
    }

    /// Adopt the token returned by a login reply. Replies without a string
    /// `CALLINFO.token` leave the session untouched.
    pub(crate) fn store_token<T>(&mut self, response: &ApiResponse<T, D::Handle>) {
        if let Some(token) = response.token() {
            self.session.token = Some(token.to_string());
        }
    }

    pub(crate) fn clear_token(&mut self) {
        self.session.token = None;
    }
}

impl<D: RequestDriver + fmt::Debug> fmt::Debug for StoredSafeClient<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSafeClient")
            .field("session", &self.session)
            .field("scheme", &self.scheme)
            .field("mtls_port", &self.mtls_port)
            .field("encode_query", &self.encode_query)
            .field("driver", &self.driver)
            .finish()
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::replay::ReplayDriver;
    use crate::error::TransportError;
    use crate::response::Outcome;
    use serde_json::json;

    const HOST: &str = "example.storedsafe.com";

    fn client() -> StoredSafeClient<ReplayDriver> {
        StoredSafeClient::with_driver(ClientConfig::new(HOST), ReplayDriver::new()).unwrap()
    }

    #[test]
    fn url_strips_leading_slash() {
        let c = client();
        assert_eq!(
            c.url("/vault", &[], false),
            "https://example.storedsafe.com/api/1.0/vault"
        );
        assert_eq!(c.url("vault", &[], false), c.url("/vault", &[], false));
    }

    #[test]
    fn url_uses_mtls_port() {
        let c = client();
        assert_eq!(
            c.url("/auth", &[], true),
            "https://example.storedsafe.com:8443/api/1.0/auth"
        );
    }

    #[test]
    fn url_appends_literal_query() {
        let c = client();
        let query = vec![
            ("needle".to_string(), "a b&c".to_string()),
            ("children".to_string(), "true".to_string()),
        ];
        assert_eq!(
            c.url("/find", &query, false),
            "https://example.storedsafe.com/api/1.0/find?needle=a b&c&children=true"
        );
    }

    #[test]
    fn url_encodes_query_when_configured() {
        let c = StoredSafeClient::with_driver(
            ClientConfig::new(HOST).encode_query(true),
            ReplayDriver::new(),
        )
        .unwrap();
        let query = vec![("needle".to_string(), "a b&c".to_string())];
        assert_eq!(
            c.url("/find", &query, false),
            "https://example.storedsafe.com/api/1.0/find?needle=a+b%26c"
        );
    }

    #[test]
    fn url_honours_scheme_and_version() {
        let c = StoredSafeClient::with_driver(
            ClientConfig::new("127.0.0.1:3000")
                .scheme(Scheme::Http)
                .api_version("2.0"),
            ReplayDriver::new(),
        )
        .unwrap();
        assert_eq!(c.url("utils/version", &[], false), "http://127.0.0.1:3000/api/2.0/utils/version");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = StoredSafeClient::with_driver(ClientConfig::new(""), ReplayDriver::new()).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[tokio::test]
    async fn get_passes_headers_and_no_body() {
        let c = client();
        c.driver().reply(200, r#"{"CALLINFO":{"status":"SUCCESS"}}"#);
        let res = c
            .get("/vault", RequestParams::new().header("x-custom", "1").query("a", 1))
            .await;
        assert!(res.success);

        let req = c.driver().last_request().unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://example.storedsafe.com/api/1.0/vault?a=1");
        assert_eq!(req.headers.get("x-custom").map(String::as_str), Some("1"));
        assert!(req.body.is_none());
    }

    #[tokio::test]
    async fn post_without_body_sends_empty_object() {
        let c = client();
        c.driver().reply(200, "{}");
        c.post("/auth/check", RequestParams::new()).await;
        let req = c.driver().last_request().unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body, Some(json!({})));
    }

    #[tokio::test]
    async fn put_keeps_given_body() {
        let c = client();
        c.driver().reply(200, "{}");
        c.put("/vault/1", RequestParams::new().body(json!({"name": "x"})))
            .await;
        let req = c.driver().last_request().unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.body, Some(json!({"name": "x"})));
    }

    #[tokio::test]
    async fn delete_has_no_body() {
        let c = client();
        c.driver().reply(200, "{}");
        c.delete("/vault/1", RequestParams::new()).await;
        let req = c.driver().last_request().unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert!(req.body.is_none());
    }

    #[tokio::test]
    async fn transport_error_becomes_failed_result() {
        let c = client();
        c.driver().fail(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )));
        let res = c.get("/vault", RequestParams::new()).await;
        assert!(!res.success);
        assert!(!res.unauthorized);
        assert_eq!(res.status, 0);
        assert_eq!(res.errors.len(), 1);
        assert!(res.errors[0].contains("connection refused"));
        assert_eq!(res.outcome, Outcome::TransportFailure);
    }

    #[test]
    fn auth_headers_require_token() {
        let c = client();
        assert!(matches!(c.auth_headers(), Err(ApiError::AuthRequired)));

        let c = StoredSafeClient::with_driver(ClientConfig::new(HOST).token("abc"), ReplayDriver::new())
            .unwrap();
        let headers = c.auth_headers().unwrap();
        assert_eq!(headers.get(TOKEN_HEADER).map(String::as_str), Some("abc"));
    }

    #[test]
    fn session_debug_redacts_secrets() {
        let c = StoredSafeClient::with_driver(
            ClientConfig::new(HOST).apikey("A1B2C3D4").token("abcde12345"),
            ReplayDriver::new(),
        )
        .unwrap();
        let shown = format!("{:?}", c.session());
        assert!(shown.contains(HOST));
        assert!(!shown.contains("A1B2C3D4"));
        assert!(!shown.contains("abcde12345"));
    }
}
