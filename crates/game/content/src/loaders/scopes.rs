//! Scope definition loader.

use std::path::Path;

use game_core::scope::ScopeDefinition;

use super::{LoadResult, parse_list_file};

/// Loader for scope definition files.
pub struct ScopeLoader;

impl ScopeLoader {
    /// Loads one scope or a list of scopes from a JSON or RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<ScopeDefinition>> {
        parse_list_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::scope::{ScopeAnchor, ScopeSource};

    #[test]
    fn loads_ron_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scopes.ron");
        std::fs::write(
            &path,
            r#"[
                (id: "core:here", source: location),
                (id: "core:contents", source: inventory, anchor: context),
            ]"#,
        )
        .unwrap();

        let scopes = ScopeLoader::load(&path).unwrap();
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].source, ScopeSource::Location);
        assert_eq!(scopes[0].anchor, ScopeAnchor::Actor);
        assert_eq!(scopes[1].anchor, ScopeAnchor::Context);
    }
}
