//! Mod directory loader.
//!
//! A content root holds one directory per mod:
//!
//! ```text
//! <root>/<mod>/actions/*.json|*.ron
//! <root>/<mod>/scopes/*.json|*.ron
//! <root>/<mod>/conditions/*.json|*.ron
//! ```
//!
//! Mods and files are read in sorted path order so the resulting catalog
//! order is stable. A file or definition that fails to load is recorded in
//! [`ModContent::failures`] and skipped.
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use game_core::action::{ActionCatalog, ActionSpec, CatalogBuild};
use game_core::{ConditionRegistry, ScopeRegistry};

use super::{ActionLoader, ConditionLoader, Format, LoadResult, ScopeLoader};

/// A file or definition that could not be loaded.
#[derive(Clone, Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: String,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Everything loaded from a set of mods.
#[derive(Clone, Debug, Default)]
pub struct ModContent {
    pub actions: Vec<ActionSpec>,
    pub scopes: ScopeRegistry,
    pub conditions: ConditionRegistry,
    pub failures: Vec<LoadFailure>,
}

impl ModContent {
    /// Validates the loaded actions into a catalog.
    pub fn build_catalog(&self) -> CatalogBuild {
        ActionCatalog::build(self.actions.iter().cloned())
    }
}

/// Loads mods from a content root.
#[derive(Clone, Debug)]
pub struct ModLoader {
    root: PathBuf,
    mods: Option<Vec<String>>,
}

impl ModLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mods: None,
        }
    }

    /// Restricts loading to `mods`, in the given order. Later mods override
    /// scopes and conditions with the same id.
    #[must_use]
    pub fn with_mods<S: Into<String>>(mut self, mods: impl IntoIterator<Item = S>) -> Self {
        self.mods = Some(mods.into_iter().map(Into::into).collect());
        self
    }

    /// Mod names that will be loaded, in load order.
    pub fn mod_names(&self) -> LoadResult<Vec<String>> {
        if let Some(mods) = &self.mods {
            return Ok(mods.clone());
        }
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("failed to read content root {}", self.root.display()))?;
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Loads every mod. Only an unreadable root or mod list is an error.
    pub fn load(&self) -> LoadResult<ModContent> {
        let mut content = ModContent::default();
        for name in self.mod_names()? {
            let dir = self.root.join(&name);
            if !dir.is_dir() {
                content.failures.push(LoadFailure {
                    path: dir,
                    error: format!("mod '{name}' not found"),
                });
                continue;
            }
            self.load_mod(&dir, &mut content);
        }
        tracing::debug!(
            root = %self.root.display(),
            actions = content.actions.len(),
            scopes = content.scopes.len(),
            conditions = content.conditions.len(),
            failures = content.failures.len(),
            "loaded mods"
        );
        Ok(content)
    }

    fn load_mod(&self, dir: &Path, content: &mut ModContent) {
        for path in definition_files(&dir.join("scopes"), &mut content.failures) {
            match ScopeLoader::load(&path) {
                Ok(scopes) => {
                    for scope in scopes {
                        if let Some(previous) = content.scopes.insert(scope) {
                            tracing::debug!(scope = %previous.id, path = %path.display(), "scope overridden");
                        }
                    }
                }
                Err(err) => content.failures.push(failure(path, &err)),
            }
        }

        for path in definition_files(&dir.join("conditions"), &mut content.failures) {
            match ConditionLoader::load(&path) {
                Ok(conditions) => {
                    for condition in conditions {
                        if content.conditions.insert(condition.id.clone(), condition.logic).is_some() {
                            tracing::debug!(condition = %condition.id, path = %path.display(), "condition overridden");
                        }
                    }
                }
                Err(err) => content.failures.push(failure(path, &err)),
            }
        }

        for path in definition_files(&dir.join("actions"), &mut content.failures) {
            match ActionLoader::load(&path) {
                Ok(actions) => {
                    for action in actions {
                        match action {
                            Ok(spec) => content.actions.push(spec),
                            Err(err) => content.failures.push(failure(path.clone(), &err)),
                        }
                    }
                }
                Err(err) => content.failures.push(failure(path, &err)),
            }
        }
    }
}

fn failure(path: PathBuf, err: &anyhow::Error) -> LoadFailure {
    tracing::warn!(path = %path.display(), "failed to load definition: {err:#}");
    LoadFailure {
        path,
        error: format!("{err:#}"),
    }
}

/// Definition files directly under `dir`, sorted. A missing directory is
/// simply empty.
fn definition_files(dir: &Path, failures: &mut Vec<LoadFailure>) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            failures.push(LoadFailure {
                path: dir.to_path_buf(),
                error: err.to_string(),
            });
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && Format::of(path).is_some())
        .collect();
    files.sort();
    files
}
