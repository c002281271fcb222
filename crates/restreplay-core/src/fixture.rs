//! Fixture files: catalogs and call scenarios kept outside the test code
//!
//! ```toml
//! allow_override = false
//!
//! [responses.get_subset_info]
//! status = 200
//! body = { num_records = 1, records = [{ name = "vol1" }] }
//!
//! [[scenarios]]
//! name = "volume_info"
//! calls = [
//!   { method = "GET", path = "cluster", response = "is_rest_96" },
//!   { method = "GET", path = "storage/volumes", response = "get_subset_info" },
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{CatalogError, ResponseCatalog};
use crate::queue::{Expectation, ExpectationQueue};
use crate::response::RestResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    Toml,
    Json,
    Yaml,
}

impl FixtureFormat {
    /// Format from the file extension, falling back to content sniffing
    /// (leading `{` means JSON, anything else TOML).
    #[must_use]
    pub fn detect(path: &Path, content: &str) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "toml" => Self::Toml,
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            _ if content.trim_start().starts_with('{') => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// A catalog of named responses plus any number of call scenarios.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FixtureFile {
    /// Whether `responses` may replace built-in names
    #[serde(default = "default_allow_override")]
    pub allow_override: bool,

    /// Responses added to the built-in catalog
    #[serde(default)]
    pub responses: BTreeMap<String, RestResponse>,

    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// Ordered list of calls one test case expects.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub calls: Vec<CallSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CallSpec {
    /// HTTP method, compared exactly
    pub method: String,
    /// Exact path, or `*` for any path
    pub path: String,
    /// Catalog name of the response
    pub response: String,
    /// Request body the call must carry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Number of consecutive identical expectations
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_allow_override() -> bool {
    true
}

fn default_repeat() -> usize {
    1
}

impl Default for FixtureFile {
    fn default() -> Self {
        Self {
            allow_override: true,
            responses: BTreeMap::new(),
            scenarios: Vec::new(),
        }
    }
}

impl FixtureFile {
    /// Load from a `.toml`, `.json`, `.yaml` or `.yml` file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FixtureError::Io(path.to_path_buf(), e.to_string()))?;
        Self::parse(&content, FixtureFormat::detect(path, &content))
    }

    /// # Errors
    ///
    /// Returns error if `content` is not a valid fixture in `format`
    pub fn parse(content: &str, format: FixtureFormat) -> Result<Self, FixtureError> {
        match format {
            FixtureFormat::Toml => {
                toml::from_str(content).map_err(|e| FixtureError::Parse(format!("Invalid TOML: {e}")))
            }
            FixtureFormat::Json => serde_json::from_str(content)
                .map_err(|e| FixtureError::Parse(format!("Invalid JSON: {e}"))),
            FixtureFormat::Yaml => serde_yml::from_str(content)
                .map_err(|e| FixtureError::Parse(format!("Invalid YAML: {e}"))),
        }
    }

    /// Built-in responses plus this file's `responses`.
    ///
    /// # Errors
    ///
    /// See [`ResponseCatalog::with_overrides`].
    pub fn catalog(&self) -> Result<ResponseCatalog, CatalogError> {
        ResponseCatalog::with_overrides(self.responses.clone(), self.allow_override)
    }

    /// # Errors
    ///
    /// [`FixtureError::UnknownScenario`] listing the defined scenarios.
    pub fn scenario(&self, name: &str) -> Result<&Scenario, FixtureError> {
        self.scenarios
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| FixtureError::UnknownScenario {
                name: name.to_string(),
                valid: self.scenarios.iter().map(|s| s.name.clone()).collect(),
            })
    }

    /// Resolve scenario `name` against `catalog` into a fresh queue.
    ///
    /// # Errors
    ///
    /// Unknown scenario, a call with `repeat = 0`, or a call naming a
    /// response missing from `catalog`.
    pub fn queue(
        &self,
        name: &str,
        catalog: &ResponseCatalog,
    ) -> Result<ExpectationQueue, FixtureError> {
        let scenario = self.scenario(name)?;
        let mut queue = ExpectationQueue::default();
        for (index, call) in scenario.calls.iter().enumerate() {
            if call.repeat == 0 {
                return Err(FixtureError::InvalidRepeat {
                    scenario: scenario.name.clone(),
                    index,
                });
            }
            let response = catalog.get(&call.response)?;
            for _ in 0..call.repeat {
                let mut expectation =
                    Expectation::new(call.method.as_str(), call.path.as_str(), response);
                if let Some(body) = &call.body {
                    expectation = expectation.with_body(body.clone());
                }
                queue.push(expectation);
            }
        }
        Ok(queue)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("scenario {name} not defined, available: [{}]", .valid.join(", "))]
    UnknownScenario { name: String, valid: Vec<String> },
    #[error("scenario {scenario}, call #{index}: repeat must be at least 1")]
    InvalidRepeat { scenario: String, index: usize },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
