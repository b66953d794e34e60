//! Pipeline configuration loader.

use std::path::Path;

use anyhow::Context;
use game_core::PipelineConfig;
use serde::de::DeserializeOwned;

use super::{LoadResult, read_file};

/// Loader for configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads a [`PipelineConfig`]; missing keys keep their defaults.
    pub fn load(path: &Path) -> LoadResult<PipelineConfig> {
        Self::load_as(path)
    }

    /// Loads any TOML-backed configuration type.
    pub fn load_as<T: DeserializeOwned>(path: &Path) -> LoadResult<T> {
        let content = read_file(path)?;
        toml::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, "evaluation_budget_ms = 250\ncollect_diagnostics = true\n").unwrap();

        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.evaluation_budget_ms, Some(250));
        assert!(config.collect_diagnostics);
        assert_eq!(config.default_max_combinations, PipelineConfig::DEFAULT_MAX_COMBINATIONS);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ConfigLoader::load(Path::new("/nonexistent/pipeline.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
