//! Entity/component store oracle.

use serde_json::Value;

use crate::state::{EntityId, EntitySnapshot, StoreError};

/// Read-only access to entities and their components.
///
/// A missing entity is `Ok(None)`; `Err` is reserved for a store that cannot
/// be read, which the orchestrator treats as fatal for the actor's turn.
pub trait EntityOracle: Send + Sync {
    /// Returns the snapshot for `id`.
    fn entity(&self, id: &EntityId) -> Result<Option<&EntitySnapshot>, StoreError>;

    /// Returns the ids of entities placed at `location`, in a stable order.
    fn entities_at(&self, location: &str) -> Result<Vec<EntityId>, StoreError>;

    /// Returns every entity id, in a stable order.
    fn entity_ids(&self) -> Result<Vec<EntityId>, StoreError>;

    /// Returns one component's data, or `None` when entity or component is absent.
    fn component_data(
        &self,
        id: &EntityId,
        component: &str,
    ) -> Result<Option<&Value>, StoreError> {
        Ok(self.entity(id)?.and_then(|entity| entity.component(component)))
    }

    fn has_component(&self, id: &EntityId, component: &str) -> Result<bool, StoreError> {
        Ok(self.component_data(id, component)?.is_some())
    }
}
