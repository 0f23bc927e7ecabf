//! Client configuration.
//!
//! Only `host` is required. Everything else has a default that matches a
//! stock vault server, so a minimal TOML file is:
//!
//! ```toml
//! host = "safe.example.com"
//! apikey = "A1B2C3D4"
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_API_VERSION: &str = "1.0";

/// Port serving certificate (mutual TLS) logins.
pub const DEFAULT_MTLS_PORT: u16 = 8443;

/// URL scheme for API requests. `Http` exists for local test servers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Host name, optionally with a port.
    pub host: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub apikey: Option<String>,
    /// A token from an earlier login, to resume a session.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default = "default_mtls_port")]
    pub mtls_port: u16,
    /// Percent-encode query parameters. Off by default: deployed servers
    /// receive the literal `key=value` pairs.
    #[serde(default)]
    pub encode_query: bool,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_mtls_port() -> u16 {
    DEFAULT_MTLS_PORT
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_version: default_api_version(),
            apikey: None,
            token: None,
            scheme: Scheme::default(),
            mtls_port: DEFAULT_MTLS_PORT,
            encode_query: false,
        }
    }

    pub fn apikey(mut self, apikey: impl Into<String>) -> Self {
        self.apikey = Some(apikey.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn mtls_port(mut self, port: u16) -> Self {
        self.mtls_port = port;
        self
    }

    pub fn encode_query(mut self, encode: bool) -> Self {
        self.encode_query = encode;
        self
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ApiError> {
        let config: Self = toml::from_str(input).map_err(|e| ApiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ApiError::Config("host must not be empty".to_string()));
        }
        if host.contains("://") || host.contains('/') {
            return Err(ApiError::Config(format!(
                "host must be a bare host name, got {host:?}"
            )));
        }
        if self.api_version.trim().is_empty() {
            return Err(ApiError::Config("api_version must not be empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .field("apikey", &self.apikey.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("scheme", &self.scheme)
            .field("mtls_port", &self.mtls_port)
            .field("encode_query", &self.encode_query)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ClientConfig::from_toml_str(r#"host = "safe.example.com""#).unwrap();
        assert_eq!(config, ClientConfig::new("safe.example.com"));
        assert_eq!(config.api_version, "1.0");
        assert_eq!(config.mtls_port, 8443);
        assert_eq!(config.scheme, Scheme::Https);
        assert!(!config.encode_query);
    }

    #[test]
    fn full_toml() {
        let config = ClientConfig::from_toml_str(
            r#"
            host = "127.0.0.1:8080"
            api_version = "2.0"
            apikey = "A1B2C3D4"
            scheme = "http"
            mtls_port = 9443
            encode_query = true
            "#,
        )
        .unwrap();
        assert_eq!(config.api_version, "2.0");
        assert_eq!(config.apikey.as_deref(), Some("A1B2C3D4"));
        assert_eq!(config.scheme, Scheme::Http);
        assert_eq!(config.mtls_port, 9443);
        assert!(config.encode_query);
    }

    #[test]
    fn missing_host_is_rejected() {
        let err = ClientConfig::from_toml_str(r#"apikey = "x""#).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn host_with_scheme_is_rejected() {
        let err = ClientConfig::new("https://safe.example.com").validate().unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn debug_redacts_credentials() {
        let config = ClientConfig::new("h").apikey("A1B2C3D4").token("abcde12345");
        let shown = format!("{config:?}");
        assert!(!shown.contains("A1B2C3D4"));
        assert!(!shown.contains("abcde12345"));
    }
}
