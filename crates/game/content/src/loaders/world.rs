//! Entity snapshot loader.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use game_core::{EntitySnapshot, EntityStore, WorldContext};
use serde_json::Value;

use super::{Format, LoadResult, read_file};

/// Entities plus the world singletons predicates may read.
#[derive(Clone, Debug, Default)]
pub struct WorldSnapshot {
    pub store: EntityStore,
    pub world: WorldContext,
}

#[derive(serde::Deserialize)]
struct WorldFile {
    #[serde(default)]
    turn: u64,
    #[serde(default)]
    globals: BTreeMap<String, Value>,
    entities: Vec<EntitySnapshot>,
}

/// Loader for world snapshot files.
pub struct WorldLoader;

impl WorldLoader {
    /// Loads a JSON or RON snapshot: either a bare list of
    /// `{ id, components }` records or `{ turn, globals, entities }`.
    pub fn load(path: &Path) -> LoadResult<WorldSnapshot> {
        let format = Format::of(path)
            .with_context(|| format!("unsupported snapshot file {}", path.display()))?;
        let content = read_file(path)?;
        let parsed = if content.trim_start().starts_with('[') {
            format
                .parse::<Vec<EntitySnapshot>>(&content)
                .map(|entities| (WorldContext::default(), entities))
        } else {
            format.parse::<WorldFile>(&content).map(|file| {
                let world = WorldContext {
                    turn: file.turn,
                    globals: file.globals,
                };
                (world, file.entities)
            })
        };
        let (world, entities) =
            parsed.with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), entities = entities.len(), "loaded world snapshot");
        Ok(WorldSnapshot {
            store: EntityStore::from_entities(entities),
            world,
        })
    }
}
