//! Read-only entity state consumed by the discovery pipeline.
//!
//! Entities are id → component-map records. The pipeline never mutates them;
//! [`EntityStore`] exists so loaders and tests can assemble a snapshot that
//! the pipeline then reads through [`crate::env::EntityOracle`].
mod entity;
mod error;
mod store;
mod world;

pub use entity::{ComponentMap, EntityId, EntitySnapshot, components};
pub use error::StoreError;
pub use store::EntityStore;
pub use world::WorldContext;
