//! Response triples: the (status, body, error) unit returned per simulated call

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Envelope;

/// Error carried by a response: a plain message or a structured payload
/// such as `{"code": 6, "message": "user is not authorized"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ErrorPayload {
    Message(String),
    Detail(Value),
}

impl ErrorPayload {
    /// Human-readable message.
    ///
    /// Structured payloads yield their `message` field when it is a string,
    /// otherwise the compact JSON rendering of the whole payload.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Message(msg) => msg.clone(),
            Self::Detail(detail) => detail
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| detail.to_string(), str::to_owned),
        }
    }

    /// Service error code, when the payload carries one.
    ///
    /// Codes are accepted both as JSON numbers and as numeric strings.
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        let Self::Detail(detail) = self else {
            return None;
        };
        match detail.get("code")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl From<&str> for ErrorPayload {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_string())
    }
}

impl From<String> for ErrorPayload {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

impl From<Value> for ErrorPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(msg) => Self::Message(msg),
            other => Self::Detail(other),
        }
    }
}

/// One simulated HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RestResponse {
    /// HTTP status code
    pub status: u16,
    /// Decoded JSON body; absent for hard failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Error surfaced verbatim to the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl RestResponse {
    #[must_use]
    pub fn new(status: u16, body: Option<Value>, error: Option<ErrorPayload>) -> Self {
        Self {
            status,
            body,
            error,
        }
    }

    /// 200 with the given body and no error.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(200, Some(body), None)
    }

    /// Hard failure: no body, an error payload.
    #[must_use]
    pub fn failure(status: u16, error: impl Into<ErrorPayload>) -> Self {
        Self::new(status, None, Some(error.into()))
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Whether `status` is a real HTTP status code (100-599).
    #[must_use]
    pub const fn has_valid_status(&self) -> bool {
        matches!(self.status, 100..=599)
    }

    /// True when the caller should treat this response as a failed call.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some() || self.status >= 400
    }

    /// Envelope view over the body, if there is one.
    #[must_use]
    pub fn envelope(&self) -> Option<Envelope<'_>> {
        self.body.as_ref().map(Envelope::new)
    }
}

impl From<&RestResponse> for RestResponse {
    fn from(response: &RestResponse) -> Self {
        response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_error_message_prefers_message_field() {
        let err = ErrorPayload::from(json!({"code": 3, "message": "Invalid API"}));
        assert_eq!(err.message(), "Invalid API");
        assert_eq!(err.code(), Some(3));
    }

    #[test]
    fn structured_error_without_message_renders_json() {
        let err = ErrorPayload::from(json!({"code": "19726344"}));
        assert_eq!(err.message(), r#"{"code":"19726344"}"#);
        assert_eq!(err.code(), Some(19_726_344));
    }

    #[test]
    fn string_value_becomes_plain_message() {
        let err = ErrorPayload::from(json!("Expected error"));
        assert_eq!(err, ErrorPayload::Message("Expected error".into()));
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Expected error");
    }

    #[test]
    fn failure_has_no_body() {
        let r = RestResponse::failure(400, "Expected error");
        assert!(r.body.is_none());
        assert!(r.is_error());
        assert!(r.has_valid_status());
    }

    #[test]
    fn error_free_4xx_is_still_an_error() {
        let r = RestResponse::new(404, Some(json!({})), None);
        assert!(r.is_error());
        assert!(!RestResponse::ok(json!({})).is_error());
    }

    #[test]
    fn status_bounds() {
        assert!(!RestResponse::new(99, None, None).has_valid_status());
        assert!(RestResponse::new(100, None, None).has_valid_status());
        assert!(RestResponse::new(599, None, None).has_valid_status());
        assert!(!RestResponse::new(600, None, None).has_valid_status());
    }

    #[test]
    fn deserialize_null_body_and_structured_error() {
        let r: RestResponse = serde_json::from_str(
            r#"{"status": 500, "body": null, "error": {"code": 6, "message": "user is not authorized"}}"#,
        )
        .unwrap();
        assert_eq!(r.status, 500);
        assert!(r.body.is_none());
        assert_eq!(r.error.as_ref().and_then(ErrorPayload::code), Some(6));
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let json = serde_json::to_value(RestResponse::ok(json!({}))).unwrap();
        assert_eq!(json, json!({"status": 200, "body": {}}));
    }
}
