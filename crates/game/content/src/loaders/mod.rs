//! Content loaders for reading definitions from files.
//!
//! Definition files are JSON (`.json`) or RON (`.ron`), chosen by extension.
//! A file holds either one definition or a list of them.

pub mod actions;
pub mod conditions;
pub mod config;
pub mod mods;
pub mod scopes;
pub mod world;

pub use actions::{ActionLoader, RawActionDefinition};
pub use conditions::ConditionLoader;
pub use config::ConfigLoader;
pub use mods::{LoadFailure, ModContent, ModLoader};
pub use scopes::ScopeLoader;
pub use world::{WorldLoader, WorldSnapshot};

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Supported definition file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Format {
    Json,
    Ron,
}

impl Format {
    pub(crate) fn of(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "ron" => Some(Self::Ron),
            _ => None,
        }
    }

    pub(crate) fn parse<T: DeserializeOwned>(self, content: &str) -> LoadResult<T> {
        match self {
            Self::Json => serde_json::from_str(content).context("invalid JSON"),
            Self::Ron => ron::from_str(content).context("invalid RON"),
        }
    }
}

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Reads a file holding either one item or a list of items.
///
/// A document whose first non-blank character is `[` is a list in both
/// formats.
pub(crate) fn parse_list_file<T: DeserializeOwned>(path: &Path) -> LoadResult<Vec<T>> {
    let format = Format::of(path)
        .with_context(|| format!("unsupported definition file {}", path.display()))?;
    let content = read_file(path)?;
    let parsed = if content.trim_start().starts_with('[') {
        format.parse(&content)
    } else {
        format.parse(&content).map(|item| vec![item])
    };
    parsed.with_context(|| format!("failed to parse {}", path.display()))
}
