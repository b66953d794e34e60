//! Named condition loader.

use std::path::Path;

use game_core::Logic;

use super::{LoadResult, parse_list_file};

/// A reusable condition as authored.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ConditionDefinition {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub logic: Logic,
}

/// Loader for condition definition files.
pub struct ConditionLoader;

impl ConditionLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<ConditionDefinition>> {
        parse_list_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_single_condition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("awake.json");
        std::fs::write(
            &path,
            json!({
                "id": "core:awake",
                "logic": { "!": { "has_component": ["actor", "core:sleeping"] } }
            })
            .to_string(),
        )
        .unwrap();

        let conditions = ConditionLoader::load(&path).unwrap();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].id, "core:awake");
    }

    #[test]
    fn malformed_logic_fails_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "id": "core:bad", "logic": { "in": [1] } }"#).unwrap();
        assert!(ConditionLoader::load(&path).is_err());
    }
}
