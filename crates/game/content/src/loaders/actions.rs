//! Action definition loader.
//!
//! Loads action definitions from JSON or RON files and normalizes the legacy
//! authoring shapes into [`ActionSpec`]:
//!
//! - required components as a flat list, or keyed by role
//!   (`{ "actor": [...], "<slot>": [...] }`)
//! - the older top-level `components` list
//! - prerequisite entries carrying a `component` reference
//!
//! Targets may be a bare scope id (one slot named `target`), a map from slot
//! name to slot, or a list of named slots.
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, bail};
use game_core::action::{ActionSpec, PrerequisiteRule, TargetSlotSpec};
use game_core::{DefinitionError, Logic, RequirementSet};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{LoadResult, parse_list_file};

/// Role key for the acting entity in role-keyed component lists.
const ACTOR_ROLE: &str = "actor";

/// Component lists as authored: flat (actor only) or keyed by role.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawComponents {
    List(Vec<String>),
    ByRole(BTreeMap<String, Vec<String>>),
}

impl Default for RawComponents {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// A prerequisite entry in structured form.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPrerequisite {
    #[serde(default)]
    pub logic: Option<Value>,
    /// Legacy: a component the actor must have.
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default, alias = "failureMessage")]
    pub failure_message: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawPrerequisiteEntry {
    Structured(RawPrerequisite),
    Bare(Value),
}

/// Slots keyed by name, in authored order.
#[derive(Clone, Debug, Default)]
pub struct NamedSlots(pub Vec<(String, Value)>);

impl<'de> Deserialize<'de> for NamedSlots {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotsVisitor;

        impl<'de> Visitor<'de> for SlotsVisitor {
            type Value = NamedSlots;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from slot name to slot definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<NamedSlots, A::Error> {
                let mut slots = Vec::new();
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    slots.push(entry);
                }
                Ok(NamedSlots(slots))
            }
        }

        deserializer.deserialize_map(SlotsVisitor)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawTargets {
    /// A single slot named `target`.
    Scope(String),
    List(Vec<TargetSlotSpec>),
    Named(NamedSlots),
}

/// An action definition as authored on disk.
#[derive(Clone, Debug, Deserialize)]
pub struct RawActionDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default, alias = "requiredComponents")]
    pub required_components: RawComponents,
    #[serde(default, alias = "forbiddenComponents")]
    pub forbidden_components: RawComponents,
    /// Legacy flat list of required actor components.
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub targets: Option<RawTargets>,
    #[serde(default)]
    pub prerequisites: Vec<RawPrerequisiteEntry>,
    #[serde(default, alias = "maxCombinations")]
    pub max_combinations: Option<usize>,
    #[serde(default, alias = "allowOptionalSlots")]
    pub allow_optional_slots: bool,
}

/// Splits role-keyed components into the actor set and per-slot sets.
fn split_roles(raw: RawComponents) -> (RequirementSet, BTreeMap<String, RequirementSet>) {
    match raw {
        RawComponents::List(components) => (components.into_iter().collect(), BTreeMap::new()),
        RawComponents::ByRole(mut roles) => {
            let actor = roles.remove(ACTOR_ROLE).unwrap_or_default();
            let slots = roles
                .into_iter()
                .map(|(role, components)| (role, components.into_iter().collect()))
                .collect();
            (actor.into_iter().collect(), slots)
        }
    }
}

fn named_slot(name: String, mut value: Value) -> LoadResult<TargetSlotSpec> {
    match &mut value {
        Value::String(scope) => return Ok(TargetSlotSpec::new(name, scope.clone())),
        Value::Object(fields) => {
            fields
                .entry("name")
                .or_insert_with(|| Value::String(name.clone()));
        }
        _ => bail!("slot '{name}' must be a scope id or an object"),
    }
    serde_json::from_value(value).with_context(|| format!("invalid slot '{name}'"))
}

impl RawActionDefinition {
    /// Folds every legacy shape into the canonical spec.
    pub fn normalize(self) -> LoadResult<ActionSpec> {
        let id = self.id;
        let (mut required, required_by_slot) = split_roles(self.required_components);
        let (forbidden, forbidden_by_slot) = split_roles(self.forbidden_components);
        required.extend(self.components);

        let mut targets = match self.targets {
            None => Vec::new(),
            Some(RawTargets::Scope(scope)) => vec![TargetSlotSpec::new("target", scope)],
            Some(RawTargets::List(slots)) => slots,
            Some(RawTargets::Named(NamedSlots(slots))) => slots
                .into_iter()
                .map(|(name, value)| named_slot(name, value))
                .collect::<LoadResult<_>>()
                .with_context(|| format!("action '{id}'"))?,
        };

        for (roles, forbid) in [(required_by_slot, false), (forbidden_by_slot, true)] {
            for (role, components) in roles {
                let Some(slot) = targets.iter_mut().find(|slot| slot.name == role) else {
                    bail!("action '{id}' lists components for unknown role '{role}'");
                };
                let set = if forbid {
                    &mut slot.validation.forbidden_components
                } else {
                    &mut slot.validation.required_components
                };
                *set = set.union(&components);
            }
        }

        let mut prerequisites = Vec::new();
        for entry in self.prerequisites {
            let (logic, failure_message) = match entry {
                RawPrerequisiteEntry::Bare(logic) => (Some(logic), None),
                RawPrerequisiteEntry::Structured(RawPrerequisite {
                    logic,
                    component,
                    failure_message,
                }) => {
                    if logic.is_none() && component.is_none() {
                        bail!("action '{id}' has a prerequisite with neither logic nor component");
                    }
                    required.extend(component);
                    (logic, failure_message)
                }
            };
            let Some(logic) = logic else {
                continue;
            };
            let index = prerequisites.len();
            let logic = Logic::parse(logic).map_err(|source| DefinitionError::InvalidLogic {
                action: id.clone(),
                index,
                source,
            })?;
            prerequisites.push(PrerequisiteRule {
                logic,
                failure_message,
            });
        }

        Ok(ActionSpec {
            id,
            name: self.name,
            description: self.description,
            template: self.template,
            required_components: required,
            forbidden_components: forbidden,
            targets,
            prerequisites,
            max_combinations: self.max_combinations,
            allow_optional_slots: self.allow_optional_slots,
        })
    }
}

/// Loader for action definition files.
pub struct ActionLoader;

impl ActionLoader {
    /// Loads every definition in `path`.
    ///
    /// Each definition is normalized independently; the outer error is for
    /// an unreadable file, the inner ones for single definitions.
    pub fn load(path: &Path) -> LoadResult<Vec<LoadResult<ActionSpec>>> {
        let entries: Vec<Value> = parse_list_file(path)?;
        Ok(entries.into_iter().map(Self::from_value).collect())
    }

    /// Normalizes one authored definition.
    pub fn from_value(value: Value) -> LoadResult<ActionSpec> {
        let hint = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_owned();
        let raw: RawActionDefinition =
            serde_json::from_value(value).with_context(|| format!("invalid action '{hint}'"))?;
        raw.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(value: Value) -> ActionSpec {
        ActionLoader::from_value(value).expect("definition should normalize")
    }

    fn components(set: &RequirementSet) -> Vec<&str> {
        set.iter().collect()
    }

    #[test]
    fn flat_required_components() {
        let spec = load(json!({ "id": "core:go", "required_components": ["core:position"] }));
        assert_eq!(components(&spec.required_components), vec!["core:position"]);
    }

    #[test]
    fn all_legacy_shapes_merge_into_one_set() {
        let spec = load(json!({
            "id": "core:cast",
            "requiredComponents": { "actor": ["core:position"], "target": ["core:health"] },
            "components": ["core:magic", "core:position"],
            "targets": "core:here",
            "prerequisites": [
                { "component": "core:mana" },
                { "logic": { ">": [{ "var": "actor.components.core:mana.value" }, 0] }, "failureMessage": "no mana" },
                { "==": [1, 1] }
            ]
        }));

        assert_eq!(
            components(&spec.required_components),
            vec!["core:magic", "core:mana", "core:position"]
        );
        assert_eq!(spec.targets.len(), 1);
        assert_eq!(spec.targets[0].name, "target");
        assert_eq!(
            components(&spec.targets[0].validation.required_components),
            vec!["core:health"]
        );
        assert_eq!(spec.prerequisites.len(), 2);
        assert_eq!(spec.prerequisites[0].failure_message.as_deref(), Some("no mana"));
        assert_eq!(spec.prerequisites[1].logic.source(), &json!({ "==": [1, 1] }));
    }

    #[test]
    fn named_targets_keep_authored_order() {
        let spec = load(json!({
            "id": "core:unlock",
            "targets": {
                "container": { "scope": "core:locked_here" },
                "key": { "scope": "core:matching_keys", "dependsOn": "container", "maxCombinations": 1 },
                "assistant": "core:here"
            }
        }));
        let names: Vec<_> = spec.targets.iter().map(|slot| slot.name.as_str()).collect();
        assert_eq!(names, vec!["container", "key", "assistant"]);
        assert_eq!(spec.targets[1].depends_on.as_deref(), Some("container"));
        assert_eq!(spec.targets[1].max_combinations, Some(1));
        assert_eq!(spec.targets[2].scope, "core:here");
    }

    #[test]
    fn listed_targets() {
        let spec = load(json!({
            "id": "core:give",
            "targets": [
                { "name": "item", "scope": "core:inventory", "required": false },
                { "name": "recipient", "scope": "core:here", "allow_self": true }
            ],
            "allow_optional_slots": true
        }));
        assert!(!spec.targets[0].required);
        assert!(spec.targets[1].allow_self);
        assert!(spec.allow_optional_slots);
    }

    #[test]
    fn unknown_role_and_bad_logic_are_errors() {
        let err = ActionLoader::from_value(json!({
            "id": "core:x",
            "forbidden_components": { "ghost": ["core:a"] }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown role 'ghost'"));

        let err = ActionLoader::from_value(json!({
            "id": "core:y",
            "prerequisites": [{ "logic": { "==": [1] } }]
        }))
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DefinitionError>(),
            Some(DefinitionError::InvalidLogic { index: 0, .. })
        ));

        let err = ActionLoader::from_value(json!({ "name": "no id" })).unwrap_err();
        assert!(err.to_string().contains("<unnamed>"));
    }
}
