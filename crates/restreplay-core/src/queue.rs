//! Ordered call expectations and the matcher that consumes them
//!
//! Expectations are consumed strictly front-to-back. Two entries with the
//! same method and path are legal and resolved by position, which is how
//! paginated results and retries are replayed.

use std::collections::VecDeque;

use serde_json::Value;

use crate::response::RestResponse;
use crate::transport::{Request, Transport};

/// Path token matching any path.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathPattern {
    /// `*`
    Any,
    Exact(String),
}

impl PathPattern {
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == path,
        }
    }
}

impl From<&str> for PathPattern {
    fn from(path: &str) -> Self {
        if path == WILDCARD {
            Self::Any
        } else {
            Self::Exact(path.to_string())
        }
    }
}

impl From<String> for PathPattern {
    fn from(path: String) -> Self {
        if path == WILDCARD {
            Self::Any
        } else {
            Self::Exact(path)
        }
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str(WILDCARD),
            Self::Exact(path) => f.write_str(path),
        }
    }
}

/// A single expected call and the response it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub method: String,
    pub path: PathPattern,
    pub response: RestResponse,
    /// When set, the request body must equal this value
    pub body: Option<Value>,
}

impl Expectation {
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        path: impl Into<PathPattern>,
        response: impl Into<RestResponse>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            response: response.into(),
            body: None,
        }
    }

    /// Expectation matching any path for `method`.
    #[must_use]
    pub fn any(method: impl Into<String>, response: impl Into<RestResponse>) -> Self {
        Self::new(method, PathPattern::Any, response)
    }

    /// Also require the request body to equal `body`.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `"GET storage/volumes"`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// A call the queue has answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Position of the matched expectation
    pub index: usize,
    pub method: String,
    pub path: String,
    /// Status of the response handed back
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    #[error("queue exhausted: unexpected call {method} {path}, no more expectations ({consumed} consumed)")]
    Exhausted {
        method: String,
        path: String,
        consumed: usize,
    },
    #[error("expectation #{index}: method mismatch, expected {expected} got {actual} (path {path})")]
    MethodMismatch {
        index: usize,
        expected: String,
        actual: String,
        path: String,
    },
    #[error("expectation #{index}: path mismatch, expected {expected} got {actual} (method {method})")]
    PathMismatch {
        index: usize,
        method: String,
        expected: String,
        actual: String,
    },
    #[error("expectation #{index} {label}: body mismatch, expected {expected} got {actual}")]
    BodyMismatch {
        index: usize,
        label: String,
        expected: String,
        actual: String,
    },
    #[error("expectation #{index} {label}: status {status} is not a valid HTTP status")]
    InvalidStatus {
        index: usize,
        label: String,
        status: u16,
    },
    #[error("{} expectation(s) not consumed: [{}]", .remaining.len(), .remaining.join(", "))]
    Unconsumed { remaining: Vec<String> },
    #[error("page {page} registered at {path} has no next link, {left} page(s) left")]
    BrokenPagination {
        path: String,
        page: usize,
        left: usize,
    },
}

/// Per-test-case queue of expected calls.
#[derive(Debug, Clone, Default)]
pub struct ExpectationQueue {
    pending: VecDeque<Expectation>,
    history: Vec<RecordedCall>,
    consumed: usize,
}

impl ExpectationQueue {
    #[must_use]
    pub fn new(expectations: impl IntoIterator<Item = Expectation>) -> Self {
        Self {
            pending: expectations.into_iter().collect(),
            history: Vec::new(),
            consumed: 0,
        }
    }

    /// Build from `(method, path, response)` triples, `"*"` being the wildcard path.
    ///
    /// ```
    /// use restreplay_core::{ExpectationQueue, ResponseCatalog};
    ///
    /// let srr = ResponseCatalog::defaults();
    /// let queue = ExpectationQueue::from_calls([
    ///     ("GET", "cluster", &srr["is_rest_96"]),
    ///     ("GET", "*", &srr["empty_records"]),
    /// ]);
    /// assert_eq!(queue.remaining(), 2);
    /// ```
    #[must_use]
    pub fn from_calls<I, M, P, R>(calls: I) -> Self
    where
        I: IntoIterator<Item = (M, P, R)>,
        M: Into<String>,
        P: Into<PathPattern>,
        R: Into<RestResponse>,
    {
        Self::new(
            calls
                .into_iter()
                .map(|(method, path, response)| Expectation::new(method, path, response)),
        )
    }

    /// Append an expectation at the back.
    pub fn push(&mut self, expectation: Expectation) {
        self.pending.push_back(expectation);
    }

    /// Match the next expectation against `request` and hand back its response.
    ///
    /// The head expectation is consumed even when matching fails.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Exhausted`] when nothing is queued, a method, path or
    /// body mismatch against the head expectation, or
    /// [`HarnessError::InvalidStatus`] when its response carries a status
    /// outside 100-599.
    pub fn next_response(&mut self, request: &Request<'_>) -> Result<RestResponse, HarnessError> {
        let index = self.consumed;
        let Some(expected) = self.pending.pop_front() else {
            return Err(HarnessError::Exhausted {
                method: request.method.to_string(),
                path: request.path.to_string(),
                consumed: index,
            });
        };
        self.consumed += 1;

        if expected.method != request.method {
            return Err(HarnessError::MethodMismatch {
                index,
                expected: expected.method,
                actual: request.method.to_string(),
                path: request.path.to_string(),
            });
        }
        if !expected.path.matches(request.path) {
            return Err(HarnessError::PathMismatch {
                index,
                method: expected.method,
                expected: expected.path.to_string(),
                actual: request.path.to_string(),
            });
        }
        if let Some(body) = &expected.body {
            if request.body != Some(body) {
                return Err(HarnessError::BodyMismatch {
                    index,
                    label: request.label(),
                    expected: body.to_string(),
                    actual: request.body.map_or_else(|| "null".to_string(), Value::to_string),
                });
            }
        }

        if !expected.response.has_valid_status() {
            return Err(HarnessError::InvalidStatus {
                index,
                label: request.label(),
                status: expected.response.status,
            });
        }

        tracing::debug!(
            index,
            method = request.method,
            path = request.path,
            status = expected.response.status,
            "matched expectation"
        );
        self.history.push(RecordedCall {
            index,
            method: request.method.to_string(),
            path: request.path.to_string(),
            status: expected.response.status,
        });
        Ok(expected.response)
    }

    /// Number of expectations not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Calls answered so far, in order.
    #[must_use]
    pub fn history(&self) -> &[RecordedCall] {
        &self.history
    }

    /// Check that every expectation was consumed.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Unconsumed`] listing the leftover expectations.
    pub fn finish(&self) -> Result<(), HarnessError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let remaining: Vec<String> = self.pending.iter().map(Expectation::label).collect();
        tracing::warn!(count = remaining.len(), "expectations left unconsumed");
        Err(HarnessError::Unconsumed { remaining })
    }
}

impl FromIterator<Expectation> for ExpectationQueue {
    fn from_iter<I: IntoIterator<Item = Expectation>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl Extend<Expectation> for ExpectationQueue {
    fn extend<I: IntoIterator<Item = Expectation>>(&mut self, iter: I) {
        self.pending.extend(iter);
    }
}

impl Transport for ExpectationQueue {
    type Error = HarnessError;

    fn send(&mut self, request: &Request<'_>) -> Result<RestResponse, HarnessError> {
        self.next_response(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResponseCatalog;
    use serde_json::json;

    fn get(path: &str) -> Request<'_> {
        Request::new("GET", path)
    }

    #[test]
    fn wildcard_token_parses_to_any() {
        assert_eq!(PathPattern::from("*"), PathPattern::Any);
        assert_eq!(
            PathPattern::from("cluster"),
            PathPattern::Exact("cluster".into())
        );
        assert_eq!(PathPattern::Any.to_string(), "*");
    }

    #[test]
    fn empty_good_then_exhausted() {
        let srr = ResponseCatalog::defaults();
        let mut queue = ExpectationQueue::from_calls([("GET", "cluster", &srr["empty_good"])]);

        let r = queue.next_response(&get("cluster")).unwrap();
        assert_eq!(r, RestResponse::ok(json!({})));

        let err = queue.next_response(&get("cluster")).unwrap_err();
        assert!(matches!(err, HarnessError::Exhausted { consumed: 1, .. }));
        insta::assert_snapshot!(
            err.to_string(),
            @"queue exhausted: unexpected call GET cluster, no more expectations (1 consumed)"
        );
    }

    #[test]
    fn exhausted_is_distinct_from_end_of_sequence() {
        let srr = ResponseCatalog::defaults();
        let mut queue = ExpectationQueue::from_calls([("GET", "*", &srr["end_of_sequence"])]);
        let r = queue.next_response(&get("anything")).unwrap();
        assert_eq!(r.status, 500);
        assert!(queue.next_response(&get("anything")).is_err());
    }

    #[test]
    fn path_mismatch_names_expected_and_actual() {
        let mut queue = ExpectationQueue::from_calls([
            ("GET", "x", RestResponse::ok(json!({"n": 1}))),
            ("GET", "y", RestResponse::ok(json!({"n": 2}))),
        ]);
        let err = queue.next_response(&get("z")).unwrap_err();
        assert_eq!(
            err,
            HarnessError::PathMismatch {
                index: 0,
                method: "GET".into(),
                expected: "x".into(),
                actual: "z".into(),
            }
        );
        insta::assert_snapshot!(
            err.to_string(),
            @"expectation #0: path mismatch, expected x got z (method GET)"
        );
    }

    #[test]
    fn method_mismatch_names_expected_and_actual() {
        let srr = ResponseCatalog::defaults();
        let mut queue = ExpectationQueue::from_calls([("POST", "api", &srr["generic_error"])]);
        let err = queue.next_response(&get("api")).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"expectation #0: method mismatch, expected POST got GET (path api)"
        );
    }

    #[test]
    fn mismatch_consumes_the_head() {
        let mut queue = ExpectationQueue::from_calls([
            ("GET", "x", RestResponse::ok(json!({}))),
            ("GET", "y", RestResponse::ok(json!({}))),
        ]);
        assert!(queue.next_response(&get("z")).is_err());
        assert_eq!(queue.remaining(), 1);
        assert!(queue.next_response(&get("y")).is_ok());
    }

    #[test]
    fn same_path_twice_resolved_by_position() {
        let first = RestResponse::ok(json!({"page": 1}));
        let second = RestResponse::ok(json!({"page": 2}));
        let mut queue = ExpectationQueue::from_calls([
            ("GET", "storage/volumes", first.clone()),
            ("GET", "storage/volumes", second.clone()),
        ]);
        assert_eq!(queue.next_response(&get("storage/volumes")).unwrap(), first);
        assert_eq!(queue.next_response(&get("storage/volumes")).unwrap(), second);
    }

    #[test]
    fn wildcard_still_checks_method() {
        let mut queue = ExpectationQueue::new([Expectation::any("GET", RestResponse::ok(json!({})))]);
        let err = queue.next_response(&Request::new("DELETE", "svm/svms")).unwrap_err();
        assert!(matches!(err, HarnessError::MethodMismatch { .. }));
    }

    #[test]
    fn error_response_returned_verbatim() {
        let srr = ResponseCatalog::defaults();
        let mut queue = ExpectationQueue::from_calls([("POST", "api", &srr["generic_error"])]);
        let r = queue.next_response(&Request::new("POST", "api")).unwrap();
        assert_eq!(&r, &srr["generic_error"]);
    }

    #[test]
    fn body_ignored_unless_expected() {
        let payload = json!({"name": "vol1"});
        let mut queue = ExpectationQueue::from_calls([("POST", "storage/volumes", RestResponse::ok(json!({})))]);
        let request = Request::new("POST", "storage/volumes").with_body(&payload);
        assert!(queue.next_response(&request).is_ok());
    }

    #[test]
    fn body_compared_when_expected() {
        let mut queue = ExpectationQueue::new([
            Expectation::new("POST", "snmp/users", RestResponse::ok(json!({})))
                .with_body(json!({"name": "user2"})),
            Expectation::new("POST", "snmp/users", RestResponse::ok(json!({})))
                .with_body(json!({"name": "user2"})),
        ]);
        let good = json!({"name": "user2"});
        let bad = json!({"name": "user3"});
        assert!(queue
            .next_response(&Request::new("POST", "snmp/users").with_body(&good))
            .is_ok());
        let err = queue
            .next_response(&Request::new("POST", "snmp/users").with_body(&bad))
            .unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @r#"expectation #1 POST snmp/users: body mismatch, expected {"name":"user2"} got {"name":"user3"}"#
        );
    }

    #[test]
    fn missing_body_reported_as_null() {
        let mut queue = ExpectationQueue::new([
            Expectation::new("PATCH", "x", RestResponse::ok(json!({}))).with_body(json!({})),
        ]);
        let err = queue.next_response(&Request::new("PATCH", "x")).unwrap_err();
        assert!(matches!(err, HarnessError::BodyMismatch { ref actual, .. } if actual == "null"));
    }

    #[test]
    fn history_records_matched_calls() {
        let srr = ResponseCatalog::defaults();
        let mut queue = ExpectationQueue::from_calls([
            ("GET", "cluster", &srr["is_rest_96"]),
            ("GET", "*", &srr["generic_error"]),
        ]);
        queue.next_response(&get("cluster")).unwrap();
        queue.next_response(&get("svm/svms")).unwrap();
        assert_eq!(
            queue.history(),
            &[
                RecordedCall {
                    index: 0,
                    method: "GET".into(),
                    path: "cluster".into(),
                    status: 200
                },
                RecordedCall {
                    index: 1,
                    method: "GET".into(),
                    path: "svm/svms".into(),
                    status: 400
                },
            ]
        );
    }

    #[test]
    fn finish_reports_leftovers() {
        let srr = ResponseCatalog::defaults();
        let mut queue = ExpectationQueue::from_calls([
            ("GET", "cluster", &srr["is_rest"]),
            ("GET", "storage/volumes", &srr["empty_records"]),
            ("DELETE", "*", &srr["empty_good"]),
        ]);
        queue.next_response(&get("cluster")).unwrap();
        let err = queue.finish().unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"2 expectation(s) not consumed: [GET storage/volumes, DELETE *]"
        );
    }

    #[test]
    fn finish_ok_when_drained() {
        let mut queue = ExpectationQueue::from_calls([("GET", "cluster", RestResponse::ok(json!({})))]);
        queue.next_response(&get("cluster")).unwrap();
        assert!(queue.finish().is_ok());
        assert!(queue.is_empty());
    }

    #[test]
    fn extend_appends_in_order() {
        let mut queue = ExpectationQueue::default();
        queue.push(Expectation::new("GET", "a", RestResponse::ok(json!(1))));
        queue.extend([Expectation::new("GET", "b", RestResponse::ok(json!(2)))]);
        assert_eq!(queue.next_response(&get("a")).unwrap().body, Some(json!(1)));
        assert_eq!(queue.next_response(&get("b")).unwrap().body, Some(json!(2)));
    }

    #[test]
    fn usable_through_transport_trait() {
        fn call<T: Transport>(mut transport: T) -> Result<RestResponse, T::Error> {
            transport.send(&Request::new("GET", "cluster"))
        }
        let mut queue = ExpectationQueue::from_calls([("GET", "cluster", RestResponse::ok(json!({})))]);
        assert!(call(&mut queue).is_ok());
        assert!(call(&mut queue).is_err());
    }

    #[test]
    fn out_of_range_status_fails_on_replay() {
        let mut queue = ExpectationQueue::from_calls([
            ("GET", "cluster", RestResponse::new(42, Some(json!({})), None)),
            ("GET", "cluster", RestResponse::ok(json!({}))),
        ]);
        let err = queue.next_response(&get("cluster")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expectation #0 GET cluster: status 42 is not a valid HTTP status"
        );
        assert!(queue.history().is_empty());
        assert_eq!(queue.next_response(&get("cluster")).unwrap().status, 200);
    }
}
