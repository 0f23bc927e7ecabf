//! Normalization of driver output into one inspectable result.
//!
//! # Design
//! Whatever driver executed the call, and whether it produced a response or
//! a transport fault, the caller receives an `ApiResponse`. Classification
//! reads only the common envelope fields every vault reply shares:
//!
//! ```json
//! {"CALLINFO": {"status": "SUCCESS", "errors": 0, "errorcodes": 0, ...},
//!  "ERRORS": ["..."], "ERRORCODES": {"code": "..."}}
//! ```
//!
//! `success` follows `CALLINFO.status` alone. `unauthorized` follows the HTTP
//! status alone. The two are independent by construction.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::http::DriverResponse;

/// Value of `CALLINFO.status` on a successful call.
pub const SUCCESS_STATUS: &str = "SUCCESS";

/// Summary of how a call ended, derived from the result flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The envelope declared `SUCCESS`.
    Success,
    /// Valid envelope that did not declare success.
    ApplicationError,
    /// HTTP 401 or 403 without a successful envelope.
    Unauthorized,
    /// The body was not JSON.
    ParseFailure,
    /// No response was received.
    TransportFailure,
}

/// Normalized result of one vault API call.
///
/// `T` tags the envelope shape the endpoint is expected to return; it is
/// only used by [`ApiResponse::data`]. `H` is the driver's response handle,
/// absent when the transport failed.
pub struct ApiResponse<T, H> {
    pub status: u16,
    pub status_text: Option<String>,
    pub body: String,
    pub handle: Option<H>,
    pub success: bool,
    pub unauthorized: bool,
    pub has_errors: bool,
    pub errors: Vec<String>,
    pub error_codes: BTreeMap<String, String>,
    /// The parsed envelope, `None` if the body was not JSON.
    pub envelope: Option<Value>,
    pub outcome: Outcome,
    shape: PhantomData<fn() -> T>,
}

impl<T, H> ApiResponse<T, H> {
    /// Classify a raw driver response.
    pub fn from_driver(response: DriverResponse<H>) -> Self {
        let DriverResponse {
            status,
            status_text,
            body,
            handle,
        } = response;
        let unauthorized = matches!(status, 401 | 403);

        let envelope: Value = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                return Self {
                    status,
                    status_text,
                    body,
                    handle: Some(handle),
                    success: false,
                    unauthorized,
                    has_errors: true,
                    errors: vec![e.to_string()],
                    error_codes: BTreeMap::new(),
                    envelope: None,
                    outcome: Outcome::ParseFailure,
                    shape: PhantomData,
                };
            }
        };

        let call_info = envelope.get("CALLINFO");
        let error_no = call_info.and_then(|c| count(c.get("errors"))).unwrap_or(0);
        let error_code_no = call_info
            .and_then(|c| count(c.get("errorcodes")))
            .unwrap_or(0);
        let errors = envelope
            .get("ERRORS")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(text).collect())
            .unwrap_or_default();
        let error_codes = envelope
            .get("ERRORCODES")
            .and_then(Value::as_object)
            .map(|codes| codes.iter().map(|(k, v)| (k.clone(), text(v))).collect())
            .unwrap_or_default();
        let success = call_info
            .and_then(|c| c.get("status"))
            .and_then(Value::as_str)
            == Some(SUCCESS_STATUS);

        let outcome = if success {
            Outcome::Success
        } else if unauthorized {
            Outcome::Unauthorized
        } else {
            Outcome::ApplicationError
        };

        Self {
            status,
            status_text,
            body,
            handle: Some(handle),
            success,
            unauthorized,
            has_errors: error_no.saturating_add(error_code_no) > 0,
            errors,
            error_codes,
            envelope: Some(envelope),
            outcome,
            shape: PhantomData,
        }
    }

    /// Describe a call that never received a response.
    pub fn from_transport_error(error: &TransportError) -> Self {
        Self {
            status: 0,
            status_text: None,
            body: String::new(),
            handle: None,
            success: false,
            unauthorized: false,
            has_errors: false,
            errors: vec![error.to_string()],
            error_codes: BTreeMap::new(),
            envelope: None,
            outcome: Outcome::TransportFailure,
            shape: PhantomData,
        }
    }

    /// Retag the result with another expected envelope shape.
    pub fn cast<U>(self) -> ApiResponse<U, H> {
        ApiResponse {
            status: self.status,
            status_text: self.status_text,
            body: self.body,
            handle: self.handle,
            success: self.success,
            unauthorized: self.unauthorized,
            has_errors: self.has_errors,
            errors: self.errors,
            error_codes: self.error_codes,
            envelope: self.envelope,
            outcome: self.outcome,
            shape: PhantomData,
        }
    }

    /// The `CALLINFO` object of the envelope, if present.
    pub fn call_info(&self) -> Option<&Value> {
        self.envelope.as_ref()?.get("CALLINFO")
    }

    /// `CALLINFO.token`, as returned by the login family.
    pub fn token(&self) -> Option<&str> {
        self.call_info()?.get("token")?.as_str()
    }
}

impl<T: DeserializeOwned, H> ApiResponse<T, H> {
    /// Deserialize the envelope into the endpoint's typed shape.
    ///
    /// Returns `None` when the body was not JSON.
    pub fn data(&self) -> Option<Result<T, serde_json::Error>> {
        self.envelope.as_ref().map(|v| T::deserialize(v))
    }
}

impl<T, H: fmt::Debug> fmt::Debug for ApiResponse<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("outcome", &self.outcome)
            .field("success", &self.success)
            .field("unauthorized", &self.unauthorized)
            .field("has_errors", &self.has_errors)
            .field("errors", &self.errors)
            .field("error_codes", &self.error_codes)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Read an error counter that may arrive as a number or a numeric string.
/// Read an error counter. Only its sign matters: fractional or negative
/// numbers count as one error or none.
fn count(value: Option<&Value>) -> Option<u64> {
    let positive = |f: f64| u64::from(f > 0.0);
    match value? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(positive)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| s.parse::<f64>().ok().map(positive))
        }
        Value::Bool(b) => Some(u64::from(*b)),
        _ => None,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(status: u16, body: &str) -> ApiResponse<Value, ()> {
        ApiResponse::from_driver(DriverResponse {
            status,
            status_text: None,
            body: body.to_string(),
            handle: (),
        })
    }

    #[test]
    fn success_envelope() {
        let res = classify(
            200,
            r#"{"CALLINFO":{"status":"SUCCESS","errors":0,"errorcodes":0}}"#,
        );
        assert!(res.success);
        assert!(!res.has_errors);
        assert!(!res.unauthorized);
        assert!(res.errors.is_empty());
        assert_eq!(res.outcome, Outcome::Success);
    }

    #[test]
    fn float_counters_count_when_positive() {
        let res = classify(200, r#"{"CALLINFO":{"status":"FAIL","errors":1.0,"errorcodes":0}}"#);
        assert!(res.has_errors);
        let res = classify(200, r#"{"CALLINFO":{"status":"FAIL","errors":"0.5"}}"#);
        assert!(res.has_errors);
        let res = classify(200, r#"{"CALLINFO":{"status":"FAIL","errors":0.0,"errorcodes":-1}}"#);
        assert!(!res.has_errors);
    }

    #[test]
    fn failure_envelope_collects_errors() {
        let res = classify(
            200,
            r#"{"ERRORS":["ERROR"],"CALLINFO":{"status":"FAIL","errors":1,"errorcodes":0}}"#,
        );
        assert!(!res.success);
        assert!(res.has_errors);
        assert_eq!(res.errors, vec!["ERROR".to_string()]);
        assert_eq!(res.outcome, Outcome::ApplicationError);
    }

    #[test]
    fn error_codes_are_collected() {
        let res = classify(
            400,
            r#"{"ERRORCODES":{"1200":"Bad vault","1300":42},"CALLINFO":{"status":"FAIL","errors":0,"errorcodes":2}}"#,
        );
        assert!(res.has_errors);
        assert_eq!(res.error_codes.get("1200").map(String::as_str), Some("Bad vault"));
        assert_eq!(res.error_codes.get("1300").map(String::as_str), Some("42"));
    }

    #[test]
    fn unauthorized_regardless_of_body() {
        for status in [401, 403] {
            assert!(classify(status, "").unauthorized);
            assert!(classify(status, "{}").unauthorized);
            assert!(classify(status, r#"{"CALLINFO":{"status":"SUCCESS"}}"#).unauthorized);
        }
        assert!(!classify(404, "{}").unauthorized);
        assert_eq!(classify(401, "{}").outcome, Outcome::Unauthorized);
    }

    #[test]
    fn success_is_independent_of_http_status() {
        let res = classify(500, r#"{"CALLINFO":{"status":"SUCCESS","errors":1}}"#);
        assert!(res.success);
        assert!(res.has_errors);

        let res = classify(200, r#"{"CALLINFO":{"status":"FAIL"}}"#);
        assert!(!res.success);
        assert!(!res.has_errors);
    }

    #[test]
    fn missing_fields_default() {
        let res = classify(200, "{}");
        assert!(!res.success);
        assert!(!res.has_errors);
        assert!(res.errors.is_empty());
        assert!(res.error_codes.is_empty());
        assert_eq!(res.envelope, Some(json!({})));
    }

    #[test]
    fn string_counters_are_accepted() {
        let res = classify(200, r#"{"CALLINFO":{"status":"FAIL","errors":"2","errorcodes":"0"}}"#);
        assert!(res.has_errors);
    }

    #[test]
    fn unparseable_body_is_a_parse_failure() {
        let res = classify(502, "<html>Bad Gateway</html>");
        assert!(!res.success);
        assert!(res.has_errors);
        assert_eq!(res.errors.len(), 1);
        assert!(res.envelope.is_none());
        assert_eq!(res.body, "<html>Bad Gateway</html>");
        assert_eq!(res.outcome, Outcome::ParseFailure);
    }

    #[test]
    fn empty_body_is_a_parse_failure() {
        let res = classify(200, "");
        assert!(!res.success);
        assert_eq!(res.outcome, Outcome::ParseFailure);
    }

    #[test]
    fn transport_error_has_single_message() {
        let error = TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        let res: ApiResponse<Value, ()> = ApiResponse::from_transport_error(&error);
        assert!(!res.success);
        assert!(!res.unauthorized);
        assert_eq!(res.status, 0);
        assert!(res.status_text.is_none());
        assert!(res.handle.is_none());
        assert_eq!(res.errors, vec!["I/O error: connection refused".to_string()]);
        assert_eq!(res.outcome, Outcome::TransportFailure);
    }

    #[test]
    fn envelope_survives_json_round_trip() {
        let body = r#"{"CALLINFO":{"status":"SUCCESS","errors":0,"errorcodes":0,"general":[],"handler":"VaultHandler"},"VAULTS":[{"id":"1","groupname":"Ops"}]}"#;
        let res = classify(200, body);
        let envelope = res.envelope.unwrap();
        let reparsed: Value = serde_json::from_str(&serde_json::to_string(&envelope).unwrap()).unwrap();
        assert_eq!(reparsed, envelope);
    }

    #[test]
    fn token_is_read_from_call_info() {
        let res = classify(200, r#"{"CALLINFO":{"token":"abcde12345"}}"#);
        assert_eq!(res.token(), Some("abcde12345"));
        assert!(classify(200, "{}").token().is_none());
    }

    #[test]
    fn typed_data_deserializes() {
        #[derive(serde::Deserialize)]
        struct Shape {
            #[serde(rename = "CALLINFO")]
            call_info: Value,
        }
        let res: ApiResponse<Shape, ()> =
            classify(200, r#"{"CALLINFO":{"status":"SUCCESS"}}"#).cast();
        let shape = res.data().unwrap().unwrap();
        assert_eq!(shape.call_info["status"], "SUCCESS");
    }
}
