//! Data-driven content definitions and loaders.
//!
//! This crate reads action, scope and condition definitions from JSON or RON
//! files, entity snapshots for tools and tests, and pipeline configuration
//! from TOML:
//! - Action definitions, normalized from every legacy authoring shape
//! - Named scopes and conditions
//! - Mod directories combining all of the above
//! - World snapshots (entities plus world singletons)
//!
//! Content is validated at load time and never changes afterwards.
pub mod loaders;

pub use loaders::{
    ActionLoader, ConditionLoader, ConfigLoader, LoadFailure, LoadResult, ModContent, ModLoader,
    RawActionDefinition, ScopeLoader, WorldLoader, WorldSnapshot,
};
