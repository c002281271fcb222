//! Live transport over `reqwest::blocking`

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use restreplay_core::{ErrorPayload, Request, RestResponse, Transport};

/// Connection settings for a live endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub hostname: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    /// Use https (default: true)
    #[serde(default = "default_true")]
    pub https: bool,
    #[serde(default)]
    pub validate_certs: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}

impl HttpConfig {
    /// `https://host[:port]/api`
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        match self.port {
            Some(port) => format!("{scheme}://{}:{port}/api", self.hostname),
            None => format!("{scheme}://{}/api", self.hostname),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("invalid HTTP method: {0}")]
    Method(String),
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("HTTP request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.validate_certs)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    type Error = HttpError;

    fn send(&mut self, request: &Request<'_>) -> Result<RestResponse, HttpError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| HttpError::Method(request.method.to_string()))?;
        let url = self.url(request.path);

        let mut builder = self
            .client
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password));
        if !request.params.is_empty() {
            builder = builder.query(request.params);
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| HttpError::Request {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let text = response.text().map_err(|e| HttpError::Request {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        tracing::debug!(method = request.method, %url, status, "live call");
        Ok(decode_response(status, &text))
    }
}

/// Turn a raw status and body into a response triple.
///
/// The service reports failures as `{"error": {"message": ..., "code": ...}}`;
/// that object becomes the triple's error. Non-JSON bodies are kept as a
/// JSON string.
fn decode_response(status: u16, text: &str) -> RestResponse {
    if text.trim().is_empty() {
        return RestResponse::new(status, None, None);
    }
    let body: Value =
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
    let error = body.get("error").cloned().map(ErrorPayload::from);
    RestResponse::new(status, Some(body), error)
}
