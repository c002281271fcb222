//! Named registry of canned responses
//!
//! Build one catalog per test module, then resolve responses by name while
//! writing each test's expectation list:
//!
//! ```
//! use restreplay_core::{ResponseCatalog, RestResponse};
//! use serde_json::json;
//!
//! let srr = ResponseCatalog::with_overrides(
//!     [("one_record", RestResponse::ok(json!({"num_records": 1, "records": [{"uuid": "a1b2c3"}]})))],
//!     false,
//! )
//! .unwrap();
//! assert!(srr.contains("one_record"));
//! assert!(srr.contains("empty_good"));
//! ```

use std::collections::BTreeMap;

use serde_json::json;

use crate::response::RestResponse;

/// Responses every catalog starts with.
fn default_responses() -> Vec<(&'static str, RestResponse)> {
    vec![
        ("is_rest", RestResponse::ok(json!({}))),
        (
            "is_rest_95",
            RestResponse::ok(json!({
                "version": {"generation": 9, "major": 5, "minor": 0, "full": "dummy_9_5_0"}
            })),
        ),
        (
            "is_rest_96",
            RestResponse::ok(json!({
                "version": {"generation": 9, "major": 6, "minor": 0, "full": "dummy_9_6_0"}
            })),
        ),
        (
            "is_zapi",
            RestResponse::new(400, Some(json!({})), Some("Unreachable".into())),
        ),
        ("empty_good", RestResponse::ok(json!({}))),
        (
            "end_of_sequence",
            RestResponse::failure(500, "Unexpected call to send_request"),
        ),
        ("empty_records", RestResponse::ok(json!({"records": []}))),
        ("generic_error", RestResponse::failure(400, "Expected error")),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("{name} not registered, list of valid keys: [{}]", .valid.join(", "))]
    NotFound { name: String, valid: Vec<String> },
    #[error("duplicated key: {0}")]
    Duplicate(String),
    #[error("response {name} has invalid HTTP status {status}")]
    InvalidStatus { name: String, status: u16 },
}

/// Read-only mapping from response name to [`RestResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCatalog {
    responses: BTreeMap<String, RestResponse>,
}

impl Default for ResponseCatalog {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ResponseCatalog {
    /// Built-in responses only.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            responses: default_responses()
                .into_iter()
                .map(|(name, response)| (name.to_string(), response))
                .collect(),
        }
    }

    /// Built-in responses augmented with `overrides`.
    ///
    /// # Errors
    ///
    /// With `allow_override == false`, any override whose name is already
    /// registered (a default or an earlier override) fails with
    /// [`CatalogError::Duplicate`]. An override with a status outside
    /// 100-599 fails with [`CatalogError::InvalidStatus`].
    pub fn with_overrides<I, K>(overrides: I, allow_override: bool) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (K, RestResponse)>,
        K: Into<String>,
    {
        let mut builder = Self::builder().allow_override(allow_override);
        for (name, response) in overrides {
            builder = builder.response(name, response);
        }
        builder.build()
    }

    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Look up a response by name.
    ///
    /// # Errors
    ///
    /// Unknown names fail with [`CatalogError::NotFound`], listing every
    /// registered name.
    pub fn get(&self, name: &str) -> Result<&RestResponse, CatalogError> {
        self.responses
            .get(name)
            .ok_or_else(|| CatalogError::NotFound {
                name: name.to_string(),
                valid: self.responses.keys().cloned().collect(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.responses.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.responses.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl std::ops::Index<&str> for ResponseCatalog {
    type Output = RestResponse;

    /// # Panics
    ///
    /// Panics with the [`CatalogError::NotFound`] message on unknown names.
    fn index(&self, name: &str) -> &RestResponse {
        match self.get(name) {
            Ok(response) => response,
            Err(e) => panic!("{e}"),
        }
    }
}

/// Incremental catalog construction.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    allow_override: bool,
    overrides: Vec<(String, RestResponse)>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self {
            allow_override: true,
            overrides: Vec::new(),
        }
    }
}

impl CatalogBuilder {
    /// Whether an override may replace an already registered name (default: true).
    #[must_use]
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    #[must_use]
    pub fn response(mut self, name: impl Into<String>, response: RestResponse) -> Self {
        self.overrides.push((name.into(), response));
        self
    }

    /// # Errors
    ///
    /// See [`ResponseCatalog::with_overrides`].
    pub fn build(self) -> Result<ResponseCatalog, CatalogError> {
        let mut catalog = ResponseCatalog::defaults();
        for (name, response) in self.overrides {
            if !response.has_valid_status() {
                return Err(CatalogError::InvalidStatus {
                    name,
                    status: response.status,
                });
            }
            if !self.allow_override && catalog.contains(&name) {
                return Err(CatalogError::Duplicate(name));
            }
            catalog.responses.insert(name, response);
        }
        Ok(catalog)
    }
}
