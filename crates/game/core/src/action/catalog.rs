//! The immutable action catalog.
use std::collections::BTreeMap;

use super::{ActionDefinition, ActionSpec, DefinitionError};
use crate::error::GameError;

/// A definition that failed to load, with the reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedDefinition {
    pub id: String,
    pub error: DefinitionError,
}

/// Outcome of [`ActionCatalog::build`].
#[derive(Clone, Debug, Default)]
pub struct CatalogBuild {
    pub catalog: ActionCatalog,
    pub rejected: Vec<RejectedDefinition>,
}

impl CatalogBuild {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Validated action definitions in load order.
///
/// ```
/// use game_core::{ActionCatalog, ActionSpec};
///
/// let build = ActionCatalog::build([
///     ActionSpec::new("core:wait").with_name("Wait"),
///     ActionSpec::new("core:look"),
/// ]);
/// assert!(build.is_clean());
///
/// let catalog = build.catalog;
/// assert_eq!(catalog.get("core:wait").map(|action| action.name()), Some("Wait"));
/// assert!(!catalog.contains("core:fly"));
/// let ids: Vec<_> = catalog.iter().map(|action| action.id()).collect();
/// assert_eq!(ids, ["core:wait", "core:look"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ActionCatalog {
    actions: Vec<ActionDefinition>,
    index: BTreeMap<String, usize>,
}

impl ActionCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles every spec, excluding and reporting the ones that fail.
    pub fn build(specs: impl IntoIterator<Item = ActionSpec>) -> CatalogBuild {
        let mut build = CatalogBuild::default();
        for spec in specs {
            let id = spec.id.clone();
            let result = ActionDefinition::compile(spec)
                .and_then(|definition| build.catalog.insert(definition));
            if let Err(error) = result {
                tracing::warn!(
                    action = %id,
                    code = error.error_code(),
                    "rejected action definition: {error}"
                );
                build.rejected.push(RejectedDefinition { id, error });
            }
        }
        tracing::debug!(
            accepted = build.catalog.len(),
            rejected = build.rejected.len(),
            "built action catalog"
        );
        build
    }

    /// Adds a compiled definition; ids must be unique.
    pub fn insert(&mut self, definition: ActionDefinition) -> Result<(), DefinitionError> {
        if self.index.contains_key(definition.id()) {
            return Err(DefinitionError::DuplicateAction(definition.id().to_owned()));
        }
        self.index.insert(definition.id().to_owned(), self.actions.len());
        self.actions.push(definition);
        Ok(())
    }

    /// Looks a definition up by action id.
    pub fn get(&self, id: &str) -> Option<&ActionDefinition> {
        self.index.get(id).map(|&index| &self.actions[index])
    }

    /// Whether a definition with this id is loaded.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Definitions in load order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.iter()
    }

    /// Number of loaded definitions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no definition is loaded.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<'a> IntoIterator for &'a ActionCatalog {
    type Item = &'a ActionDefinition;
    type IntoIter = std::slice::Iter<'a, ActionDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
