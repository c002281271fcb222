//! REST client over any [`Transport`]
//!
//! The client owns the translation of error-bearing responses into
//! [`ClientError`]s, the aggregation of paginated collections and the job
//! polling retry policy. The transport only moves one call at a time.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use restreplay_core::{
    Envelope, ErrorPayload, Request, RestResponse, Transport, Version, strip_api_prefix,
};

use crate::error::ClientError;
use crate::warnings::Warnings;

/// Attempts spent on a job that keeps answering with errors.
pub const DEFAULT_JOB_ATTEMPTS: u32 = 4;

/// Polls spent on a job before giving up on it.
pub const DEFAULT_MAX_POLLS: u32 = 60;

/// A whole collection, every page concatenated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Records {
    pub num_records: usize,
    pub records: Vec<Value>,
}

impl Records {
    fn extend(&mut self, page: &[Value]) {
        self.records.extend(page.iter().cloned());
        self.num_records = self.records.len();
    }
}

pub struct RestClient<T> {
    transport: T,
    max_records: Option<u32>,
    job_attempts: u32,
    max_polls: u32,
    poll_interval: Duration,
}

impl<T: Transport> RestClient<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_records: None,
            job_attempts: DEFAULT_JOB_ATTEMPTS,
            max_polls: DEFAULT_MAX_POLLS,
            poll_interval: Duration::ZERO,
        }
    }

    /// Page size requested on the first call of a collection read.
    #[must_use]
    pub fn with_max_records(mut self, max_records: Option<u32>) -> Self {
        self.max_records = max_records;
        self
    }

    #[must_use]
    pub fn with_job_attempts(mut self, attempts: u32) -> Self {
        self.job_attempts = attempts.max(1);
        self
    }

    /// Upper bound on job polls, failed or not.
    #[must_use]
    pub fn with_max_polls(mut self, polls: u32) -> Self {
        self.max_polls = polls.max(1);
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// One call, response returned untranslated.
    ///
    /// # Errors
    ///
    /// [`ClientError::Transport`] only.
    pub fn send_raw(&mut self, request: &Request<'_>) -> Result<RestResponse, ClientError> {
        self.transport
            .send(request)
            .map_err(|e| ClientError::Transport(Box::new(e)))
    }

    /// One call; error-bearing responses become [`ClientError::Service`].
    ///
    /// # Errors
    ///
    /// Transport failure, or a response with an error or a status >= 400.
    pub fn send(&mut self, request: &Request<'_>) -> Result<Value, ClientError> {
        let response = self.send_raw(request)?;
        into_result(response)
    }

    /// # Errors
    ///
    /// See [`RestClient::send`].
    pub fn get(&mut self, path: &str, params: &[(String, String)]) -> Result<Value, ClientError> {
        self.send(&Request::new("GET", path).with_params(params))
    }

    /// # Errors
    ///
    /// See [`RestClient::send`].
    pub fn post(&mut self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.send(&Request::new("POST", path).with_body(body))
    }

    /// # Errors
    ///
    /// See [`RestClient::send`].
    pub fn patch(&mut self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.send(&Request::new("PATCH", path).with_body(body))
    }

    /// # Errors
    ///
    /// See [`RestClient::send`].
    pub fn delete(&mut self, path: &str) -> Result<Value, ClientError> {
        self.send(&Request::new("DELETE", path))
    }

    /// Read a collection, following `_links.next.href` until the last page.
    ///
    /// # Errors
    ///
    /// The first failing page aborts the read.
    pub fn get_all_records(
        &mut self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Records, ClientError> {
        let mut query = params.to_vec();
        if let Some(max) = self.max_records {
            if !query.iter().any(|(k, _)| k == "max_records") {
                query.push(("max_records".to_string(), max.to_string()));
            }
        }

        let first = self.get(path, &query)?;
        let envelope = Envelope::new(&first);
        let mut all = Records {
            num_records: 0,
            records: Vec::new(),
        };
        all.extend(envelope.records());
        let mut next = envelope.next_path().map(str::to_owned);

        while let Some(next_path) = next {
            tracing::debug!(path, next = %next_path, "following next link");
            // The link already carries the query of the first call.
            let page = self.get(&next_path, &[])?;
            let envelope = Envelope::new(&page);
            all.extend(envelope.records());
            next = envelope.next_path().map(str::to_owned);
        }
        Ok(all)
    }

    /// Version probe against `cluster`.
    ///
    /// # Errors
    ///
    /// Call failure, or [`ClientError::Malformed`] when the body has no
    /// version object.
    pub fn cluster_version(&mut self) -> Result<Version, ClientError> {
        let params = [("fields".to_string(), "version".to_string())];
        let body = self.get("cluster", &params)?;
        Envelope::new(&body)
            .version()
            .ok_or_else(|| ClientError::Malformed {
                path: "cluster".to_string(),
                reason: "no version object".to_string(),
            })
    }

    /// Poll a job until it reaches `success` or `failure`.
    ///
    /// A service error while polling is retried until `job_attempts` calls
    /// have failed; each retried failure is recorded in `warnings`. At most
    /// `max_polls` calls are made in total.
    ///
    /// # Errors
    ///
    /// The last service error once attempts are spent, any transport error
    /// immediately, [`ClientError::JobFailed`], or
    /// [`ClientError::JobTimeout`] once `max_polls` is reached.
    pub fn wait_for_job(&mut self, href: &str, warnings: &mut Warnings) -> Result<Value, ClientError> {
        let path = strip_api_prefix(href);
        let mut failures = 0;
        for poll in 1..=self.max_polls {
            match self.get(path, &[]) {
                Ok(job) => {
                    let state = job.get("state").and_then(Value::as_str).map(str::to_owned);
                    match state.as_deref() {
                        Some("success") => return Ok(job),
                        Some("failure") => {
                            let message = job
                                .get("message")
                                .and_then(Value::as_str)
                                .unwrap_or("no message")
                                .to_string();
                            return Err(ClientError::JobFailed {
                                href: href.to_string(),
                                message,
                            });
                        }
                        _ => tracing::debug!(path, ?state, "job not finished"),
                    }
                }
                Err(err @ ClientError::Service { .. }) if failures + 1 < self.job_attempts => {
                    failures += 1;
                    warnings.push(format!("error polling job {path} (attempt {failures}): {err}"));
                }
                Err(err) => return Err(err),
            }
            if poll < self.max_polls && !self.poll_interval.is_zero() {
                std::thread::sleep(self.poll_interval);
            }
        }
        Err(ClientError::JobTimeout {
            href: href.to_string(),
            polls: self.max_polls,
        })
    }

    /// POST, then wait on the job the service hands back, if any.
    ///
    /// # Errors
    ///
    /// See [`RestClient::post`] and [`RestClient::wait_for_job`].
    pub fn post_and_wait(
        &mut self,
        path: &str,
        body: &Value,
        warnings: &mut Warnings,
    ) -> Result<Value, ClientError> {
        let response = self.post(path, body)?;
        match response.pointer("/job/_links/self/href").and_then(Value::as_str) {
            Some(href) => self.wait_for_job(href, warnings),
            None => Ok(response),
        }
    }
}

fn into_result(response: RestResponse) -> Result<Value, ClientError> {
    if let Some(error) = response.error {
        return Err(ClientError::Service {
            status: response.status,
            error,
        });
    }
    if response.status >= 400 {
        return Err(ClientError::Service {
            status: response.status,
            error: ErrorPayload::Message(format!("HTTP status {}", response.status)),
        });
    }
    Ok(response.body.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use restreplay_core::{ExpectationQueue, HarnessError, ResponseCatalog};
    use serde_json::json;

    #[test]
    fn error_free_success_yields_body() {
        let value = into_result(RestResponse::ok(json!({"a": 1}))).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn missing_body_yields_null() {
        let value = into_result(RestResponse::new(204, None, None)).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn error_field_wins_over_status() {
        let err = into_result(RestResponse::new(200, None, Some("API not found error".into())))
            .unwrap_err();
        assert_eq!(err.to_string(), "API not found error");
    }

    #[test]
    fn bare_4xx_gets_a_message() {
        let err = into_result(RestResponse::new(404, Some(json!({})), None)).unwrap_err();
        assert_eq!(err.to_string(), "HTTP status 404");
    }

    /// Queue wrapper that keeps the query parameters of every call.
    struct ParamRecorder {
        queue: ExpectationQueue,
        seen: Vec<Vec<(String, String)>>,
    }

    impl Transport for ParamRecorder {
        type Error = HarnessError;

        fn send(&mut self, request: &Request<'_>) -> Result<RestResponse, HarnessError> {
            self.seen.push(request.params.to_vec());
            self.queue.next_response(request)
        }
    }

    #[test]
    fn max_records_added_to_first_call_only() {
        let queue = ExpectationQueue::from_calls([
            (
                "GET",
                "storage/volumes",
                RestResponse::ok(json!({
                    "records": [{"name": "v1"}],
                    "_links": {"next": {"href": "/api/storage/volumes?start=1&max_records=1"}}
                })),
            ),
            (
                "GET",
                "/storage/volumes?start=1&max_records=1",
                RestResponse::ok(json!({"records": [{"name": "v2"}]})),
            ),
        ]);
        let mut client = RestClient::new(ParamRecorder {
            queue,
            seen: Vec::new(),
        })
        .with_max_records(Some(1));
        let fields = [("fields".to_string(), "*".to_string())];
        let records = client.get_all_records("storage/volumes", &fields).unwrap();
        assert_eq!(records.num_records, 2);

        let recorder = client.into_transport();
        assert_eq!(
            recorder.seen,
            vec![
                vec![
                    ("fields".to_string(), "*".to_string()),
                    ("max_records".to_string(), "1".to_string()),
                ],
                vec![],
            ]
        );
        recorder.queue.finish().unwrap();
    }

    #[test]
    fn explicit_max_records_kept() {
        let srr = ResponseCatalog::defaults();
        let mut client = RestClient::new(ParamRecorder {
            queue: ExpectationQueue::from_calls([("GET", "svm/svms", &srr["empty_records"])]),
            seen: Vec::new(),
        })
        .with_max_records(Some(1024));
        let params = [("max_records".to_string(), "5".to_string())];
        client.get_all_records("svm/svms", &params).unwrap();
        assert_eq!(client.transport().seen[0], params.to_vec());
    }

    #[test]
    fn harness_failure_is_not_retried() {
        let srr = ResponseCatalog::defaults();
        let mut client = RestClient::new(ExpectationQueue::from_calls([(
            "GET",
            "cluster/jobs/1",
            &srr["generic_error"],
        )]));
        let mut warnings = Warnings::new();
        let err = client.wait_for_job("/api/cluster/jobs/1", &mut warnings).unwrap_err();
        assert!(matches!(
            err.harness_error(),
            Some(HarnessError::Exhausted { consumed: 1, .. })
        ));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn running_job_stops_at_max_polls() {
        let running = RestResponse::ok(json!({"state": "running"}));
        let mut client = RestClient::new(ExpectationQueue::new(restreplay_core::replay::repeat(
            "GET",
            "cluster/jobs/1",
            &running,
            3,
        )))
        .with_max_polls(3);
        let mut warnings = Warnings::new();
        let err = client.wait_for_job("/api/cluster/jobs/1", &mut warnings).unwrap_err();
        assert_eq!(err.to_string(), "job /api/cluster/jobs/1 not finished after 3 poll(s)");
        assert!(warnings.is_empty());
        client.into_transport().finish().unwrap();
    }

    #[test]
    fn job_attempts_never_zero() {
        let client = RestClient::new(ExpectationQueue::default()).with_job_attempts(0);
        assert_eq!(client.job_attempts, 1);
    }
}
