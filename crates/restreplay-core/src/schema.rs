//! JSON Schema of the fixture file format

use crate::fixture::FixtureFile;

/// Pretty-printed JSON Schema for [`FixtureFile`].
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(FixtureFile);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}
