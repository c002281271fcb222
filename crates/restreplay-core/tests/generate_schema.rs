//! Integration test that writes the fixture JSON Schema to disk
//!
//! Run with: cargo test -p restreplay-core --test generate_schema

use restreplay_core::schema::generate_schema;

#[test]
fn write_schema_file() {
    let schema = generate_schema();

    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("fixture.schema.json");
    std::fs::write(&schema_path, &schema).expect("failed to write schema file");

    let content = std::fs::read_to_string(&schema_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(
        parsed.get("title").and_then(|v| v.as_str()),
        Some("FixtureFile")
    );
}
