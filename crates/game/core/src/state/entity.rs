use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::action::RequirementSet;

/// Component id → component data.
pub type ComponentMap = BTreeMap<String, Value>;

/// Well-known component ids and the fields the pipeline reads from them.
pub mod components {
    /// Spatial placement. `locationId` names the containing location entity.
    pub const POSITION: &str = "core:position";
    pub const POSITION_LOCATION: &str = "locationId";

    /// Carried items. `items` is an ordered array of entity ids.
    pub const INVENTORY: &str = "core:inventory";
    pub const INVENTORY_ITEMS: &str = "items";

    /// Display name. `text` is used when formatting commands.
    pub const NAME: &str = "core:name";
    pub const NAME_TEXT: &str = "text";
}

/// Namespaced entity identifier (`mod:name`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the mod namespace (`core` in `core:player`), if present.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(ns, _)| ns)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An entity and its components as seen at evaluation time.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    #[serde(default)]
    pub components: ComponentMap,
}

impl EntitySnapshot {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            components: ComponentMap::new(),
        }
    }

    /// Attaches a component (builder pattern).
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>, data: Value) -> Self {
        self.components.insert(component.into(), data);
        self
    }

    pub fn component(&self, component: &str) -> Option<&Value> {
        self.components.get(component)
    }

    pub fn has_component(&self, component: &str) -> bool {
        self.components.contains_key(component)
    }

    /// Returns the set of component ids present on this entity.
    pub fn component_set(&self) -> RequirementSet {
        self.components.keys().cloned().collect()
    }

    /// Reads `component.field`, treating JSON `null` as absent.
    pub fn field(&self, component: &str, field: &str) -> Option<&Value> {
        self.component(component)?
            .get(field)
            .filter(|value| !value.is_null())
    }

    /// The location this entity is placed in, from `core:position.locationId`.
    pub fn location(&self) -> Option<&str> {
        self.field(components::POSITION, components::POSITION_LOCATION)?
            .as_str()
    }

    /// Entity ids listed in `core:inventory.items`, in stored order.
    pub fn inventory(&self) -> Vec<EntityId> {
        self.field(components::INVENTORY, components::INVENTORY_ITEMS)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(EntityId::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Display name from `core:name.text`, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.field(components::NAME, components::NAME_TEXT)
            .and_then(Value::as_str)
            .unwrap_or(self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn namespace_is_prefix_before_colon() {
        assert_eq!(EntityId::from("core:player").namespace(), Some("core"));
        assert_eq!(EntityId::from("player").namespace(), None);
    }

    #[test]
    fn location_and_inventory_accessors() {
        let entity = EntitySnapshot::new("core:hero")
            .with_component(components::POSITION, json!({ "locationId": "core:hall" }))
            .with_component(
                components::INVENTORY,
                json!({ "items": ["core:key", 7, "core:lamp"] }),
            );

        assert_eq!(entity.location(), Some("core:hall"));
        assert_eq!(
            entity.inventory(),
            vec![EntityId::from("core:key"), EntityId::from("core:lamp")]
        );
        assert_eq!(entity.display_name(), "core:hero");
    }

    #[test]
    fn null_fields_read_as_absent() {
        let entity = EntitySnapshot::new("core:ghost")
            .with_component(components::POSITION, json!({ "locationId": null }));
        assert_eq!(entity.location(), None);
        assert!(entity.has_component(components::POSITION));
    }
}
