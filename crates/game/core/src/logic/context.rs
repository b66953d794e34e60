use std::collections::BTreeMap;

use serde_json::Value;

use crate::state::{EntitySnapshot, WorldContext};

/// Bindings visible to an expression during one evaluation.
///
/// Built fresh per candidate and discarded afterwards. Paths resolve against
/// these roots:
///
/// - `actor` - the acting entity
/// - `entity` - the candidate under test inside a scope filter
/// - `target` - the primary target, or the context entity of a dependent slot
/// - `targets.<slot>` - any slot bound so far
/// - `world.<key>` - world singletons (`world.turn`)
///
/// Below an entity root, `id` yields the entity id and
/// `components.<component-id>.<field>...` walks component data. A bare entity
/// root (`"target"`) yields its id.
#[derive(Clone, Debug)]
pub struct EvaluationContext<'a> {
    actor: &'a EntitySnapshot,
    entity: Option<&'a EntitySnapshot>,
    target: Option<&'a EntitySnapshot>,
    targets: BTreeMap<&'a str, &'a EntitySnapshot>,
    world: &'a WorldContext,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(actor: &'a EntitySnapshot, world: &'a WorldContext) -> Self {
        Self {
            actor,
            entity: None,
            target: None,
            targets: BTreeMap::new(),
            world,
        }
    }

    #[must_use]
    pub fn with_entity(mut self, entity: &'a EntitySnapshot) -> Self {
        self.entity = Some(entity);
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: Option<&'a EntitySnapshot>) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_slot(mut self, slot: &'a str, entity: &'a EntitySnapshot) -> Self {
        self.targets.insert(slot, entity);
        self
    }

    pub fn actor(&self) -> &'a EntitySnapshot {
        self.actor
    }

    pub fn world(&self) -> &'a WorldContext {
        self.world
    }

    /// Resolves an entity root path (`actor`, `entity`, `target`, `targets.<slot>`).
    pub fn entity_at(&self, path: &str) -> Option<&'a EntitySnapshot> {
        match path {
            "actor" => Some(self.actor),
            "entity" => self.entity,
            "target" => self.target,
            _ => {
                let slot = path.strip_prefix("targets.")?;
                self.targets.get(slot).copied()
            }
        }
    }

    /// Resolves a dotted path to a value. `None` when any segment is missing.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let entity = match segments.next()? {
            "world" => {
                let value = self.world.get(segments.next()?)?;
                return walk(&value, segments).cloned();
            }
            "actor" => self.actor,
            "entity" => self.entity?,
            "target" => self.target?,
            "targets" => self.targets.get(segments.next()?).copied()?,
            _ => return None,
        };

        match segments.next() {
            None | Some("id") => Some(Value::String(entity.id.to_string())),
            Some("components") => match segments.next() {
                None => serde_json::to_value(&entity.components).ok(),
                Some(component) => walk(entity.component(component)?, segments).cloned(),
            },
            Some(_) => None,
        }
    }
}

fn walk<'v, 's>(value: &'v Value, segments: impl Iterator<Item = &'s str>) -> Option<&'v Value> {
    let mut current = value;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_component_fields_and_ids() {
        let actor = EntitySnapshot::new("core:hero")
            .with_component("core:stats", json!({ "level": 4, "tags": ["brave", "tall"] }));
        let chest = EntitySnapshot::new("core:chest")
            .with_component("core:lock", json!({ "lockType": "brass" }));
        let world = WorldContext::new(12);
        let ctx = EvaluationContext::new(&actor, &world)
            .with_target(Some(&chest))
            .with_slot("container", &chest);

        assert_eq!(ctx.resolve("actor.components.core:stats.level"), Some(json!(4)));
        assert_eq!(ctx.resolve("actor.components.core:stats.tags.1"), Some(json!("tall")));
        assert_eq!(ctx.resolve("actor.id"), Some(json!("core:hero")));
        assert_eq!(ctx.resolve("target"), Some(json!("core:chest")));
        assert_eq!(
            ctx.resolve("targets.container.components.core:lock.lockType"),
            Some(json!("brass"))
        );
        assert_eq!(ctx.resolve("world.turn"), Some(json!(12)));
    }

    #[test]
    fn missing_segments_resolve_to_none() {
        let actor = EntitySnapshot::new("core:hero");
        let world = WorldContext::default();
        let ctx = EvaluationContext::new(&actor, &world);

        assert_eq!(ctx.resolve("actor.components.core:stats.level"), None);
        assert_eq!(ctx.resolve("entity.id"), None);
        assert_eq!(ctx.resolve("targets.key"), None);
        assert_eq!(ctx.resolve("nonsense.path"), None);
        assert!(ctx.entity_at("target").is_none());
    }
}
