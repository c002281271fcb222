//! Read-only view over the service's response envelope
//!
//! Collection responses look like:
//!
//! ```json
//! {
//!   "num_records": 3,
//!   "records": [{"name": "vol1"}, {"name": "vol2"}, {"name": "vol3"}],
//!   "_links": {"self": {"href": "..."}, "next": {"href": "/api/storage/volumes?start=3"}}
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix every `href` in `_links` carries.
pub const API_PREFIX: &str = "/api/";

/// Cluster version as reported by the version probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub generation: u32,
    pub major: u32,
    pub minor: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full: Option<String>,
}

impl Version {
    /// `(generation, major, minor)` >= the given triple.
    #[must_use]
    pub fn at_least(&self, generation: u32, major: u32, minor: u32) -> bool {
        (self.generation, self.major, self.minor) >= (generation, major, minor)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    body: &'a Value,
}

impl<'a> Envelope<'a> {
    #[must_use]
    pub const fn new(body: &'a Value) -> Self {
        Self { body }
    }

    #[must_use]
    pub fn num_records(&self) -> Option<u64> {
        self.body.get("num_records").and_then(Value::as_u64)
    }

    /// Records in order; empty when the body has none.
    #[must_use]
    pub fn records(&self) -> &'a [Value] {
        self.body
            .get("records")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Raw `_links.next.href`.
    #[must_use]
    pub fn next_href(&self) -> Option<&'a str> {
        self.body.pointer("/_links/next/href").and_then(Value::as_str)
    }

    /// Path of the next page, relative to the API root but keeping its
    /// leading slash: `/api/next_record_api` becomes `/next_record_api`.
    #[must_use]
    pub fn next_path(&self) -> Option<&'a str> {
        self.next_href().map(next_page_path)
    }

    /// Parsed `version` object; `None` when absent or not an object.
    #[must_use]
    pub fn version(&self) -> Option<Version> {
        let version = self.body.get("version")?;
        Version::deserialize(version).ok()
    }
}

fn next_page_path(href: &str) -> &str {
    if href.starts_with(API_PREFIX) {
        &href[API_PREFIX.len() - 1..]
    } else {
        href
    }
}

/// Strip the API prefix entirely: `/api/cluster/jobs/1` becomes `cluster/jobs/1`.
#[must_use]
pub fn strip_api_prefix(href: &str) -> &str {
    href.strip_prefix(API_PREFIX).unwrap_or(href)
}
