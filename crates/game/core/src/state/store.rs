use std::collections::{BTreeMap, BTreeSet};

use super::{EntityId, EntitySnapshot, StoreError};
use crate::env::EntityOracle;

/// In-memory entity snapshot keyed by id.
///
/// Iteration and location queries return ids in ascending id order so that
/// repeated evaluations over the same snapshot see the same ordering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityStore {
    entities: BTreeMap<EntityId, EntitySnapshot>,
    by_location: BTreeMap<String, BTreeSet<EntityId>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from snapshots; later duplicates replace earlier ones.
    pub fn from_entities(entities: impl IntoIterator<Item = EntitySnapshot>) -> Self {
        let mut store = Self::new();
        for entity in entities {
            store.insert(entity);
        }
        store
    }

    /// Inserts or replaces an entity, keeping the location index current.
    pub fn insert(&mut self, entity: EntitySnapshot) -> Option<EntitySnapshot> {
        let id = entity.id.clone();
        let previous = self.entities.remove(&id);
        if let Some(old_location) = previous.as_ref().and_then(EntitySnapshot::location)
            && let Some(ids) = self.by_location.get_mut(old_location)
        {
            ids.remove(&id);
        }
        if let Some(location) = entity.location() {
            self.by_location
                .entry(location.to_owned())
                .or_default()
                .insert(id.clone());
        }
        self.entities.insert(id, entity);
        previous
    }

    /// Looks an entity up by id.
    pub fn get(&self, id: &str) -> Option<&EntitySnapshot> {
        self.entities.get(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities.values()
    }
}

impl EntityOracle for EntityStore {
    fn entity(&self, id: &EntityId) -> Result<Option<&EntitySnapshot>, StoreError> {
        Ok(self.entities.get(id))
    }

    fn entities_at(&self, location: &str) -> Result<Vec<EntityId>, StoreError> {
        Ok(self
            .by_location
            .get(location)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn entity_ids(&self) -> Result<Vec<EntityId>, StoreError> {
        Ok(self.entities.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::components;
    use serde_json::json;

    fn placed(id: &str, location: &str) -> EntitySnapshot {
        EntitySnapshot::new(id)
            .with_component(components::POSITION, json!({ "locationId": location }))
    }

    #[test]
    fn entities_at_returns_sorted_ids() {
        let store = EntityStore::from_entities([
            placed("core:zed", "core:hall"),
            placed("core:amy", "core:hall"),
            placed("core:bob", "core:yard"),
        ]);

        let ids = store.entities_at("core:hall").unwrap();
        assert_eq!(ids, vec![EntityId::from("core:amy"), EntityId::from("core:zed")]);
    }

    #[test]
    fn reinsert_moves_location_index() {
        let mut store = EntityStore::from_entities([placed("core:amy", "core:hall")]);
        store.insert(placed("core:amy", "core:yard"));

        assert!(store.entities_at("core:hall").unwrap().is_empty());
        assert_eq!(store.entities_at("core:yard").unwrap().len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn component_queries_through_oracle() {
        let store = EntityStore::from_entities([placed("core:amy", "core:hall")]);
        let amy = EntityId::from("core:amy");

        assert!(store.has_component(&amy, components::POSITION).unwrap());
        assert!(!store.has_component(&amy, components::INVENTORY).unwrap());
        assert!(
            !store
                .has_component(&EntityId::from("core:nobody"), components::POSITION)
                .unwrap()
        );
        assert_eq!(
            store.component_data(&amy, components::POSITION).unwrap(),
            Some(&json!({ "locationId": "core:hall" }))
        );
    }
}
