//! JSON Schema generation for the configuration and rule files.

use crate::config::GroupyConfig;
use crate::rules::Rule;

const SCHEMA_BASE_URL: &str = "https://raw.githubusercontent.com/groupy-dev/groupy/main";

/// Generates a JSON Schema for the Groupy configuration.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    with_id(schemars::schema_for!(GroupyConfig), "groupy.schema.json")
}

/// Generates a JSON Schema for the rule file (an ordered array of rules).
#[must_use]
pub fn generate_rules_schema() -> schemars::Schema {
    with_id(schemars::schema_for!(Vec<Rule>), "groupy-rules.schema.json")
}

fn with_id(mut schema: schemars::Schema, file: &str) -> schemars::Schema {
    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!(format!("{SCHEMA_BASE_URL}/{file}")));
    }
    schema
}

/// Generates a pretty-printed JSON Schema string for the configuration.
#[must_use]
pub fn generate_schema_json() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}

/// Generates a pretty-printed JSON Schema string for the rule file.
#[must_use]
pub fn generate_rules_schema_json() -> String {
    serde_json::to_string_pretty(&generate_rules_schema()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_schema_produces_valid_json() {
        let parsed: serde_json::Value = serde_json::from_str(&generate_schema_json()).unwrap();

        assert!(parsed["$id"].as_str().unwrap().ends_with("groupy.schema.json"));
        assert_eq!(parsed["$schema"], "https://json-schema.org/draft/2020-12/schema");
        assert_eq!(parsed["title"], "GroupyConfig");
        assert!(parsed["properties"]["debounceMs"].is_object());
        assert!(parsed["properties"]["dom"].is_object());
    }

    #[test]
    fn test_rules_schema_is_array_of_rules() {
        let parsed: serde_json::Value = serde_json::from_str(&generate_rules_schema_json()).unwrap();

        assert!(parsed["$id"].as_str().unwrap().ends_with("groupy-rules.schema.json"));
        assert_eq!(parsed["type"], "array");
        assert!(parsed.to_string().contains("groupName"));
    }
}
