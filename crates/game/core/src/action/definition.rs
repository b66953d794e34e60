//! Action definitions and their load-time compilation.
//!
//! [`ActionSpec`] is the authored shape. [`ActionDefinition::compile`]
//! validates it once and fixes the slot resolution order, so the pipeline
//! never revisits authoring mistakes per evaluation.
use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::{DefinitionError, RequirementSet};
use crate::logic::Logic;
use crate::state::EntitySnapshot;

/// JSON type expected for a component field in slot validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[derive(strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// Present and not null.
    Any,
}

impl ValueKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => !value.is_null(),
        }
    }
}

/// Why a candidate entity failed a slot's structural validation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotViolation {
    MissingComponent { component: String },
    ForbiddenComponent { component: String },
    FieldMismatch {
        component: String,
        field: String,
        expected: ValueKind,
    },
}

/// Component-shape checks applied to every candidate of a slot.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SlotValidation {
    pub required_components: RequirementSet,
    pub forbidden_components: RequirementSet,
    /// Fields that must be present with the given type, per component.
    pub component_fields: BTreeMap<String, BTreeMap<String, ValueKind>>,
}

impl SlotValidation {
    pub fn is_empty(&self) -> bool {
        self.required_components.is_empty()
            && self.forbidden_components.is_empty()
            && self.component_fields.is_empty()
    }

    /// Reports the first violation in required, forbidden, field order.
    pub fn check(&self, entity: &EntitySnapshot) -> Result<(), SlotViolation> {
        if let Some(component) = self
            .required_components
            .iter()
            .find(|component| !entity.has_component(component))
        {
            return Err(SlotViolation::MissingComponent {
                component: component.to_owned(),
            });
        }
        if let Some(component) = self
            .forbidden_components
            .iter()
            .find(|component| entity.has_component(component))
        {
            return Err(SlotViolation::ForbiddenComponent {
                component: component.to_owned(),
            });
        }
        for (component, fields) in &self.component_fields {
            for (field, expected) in fields {
                let matches = entity
                    .field(component, field)
                    .is_some_and(|value| expected.matches(value));
                if !matches {
                    return Err(SlotViolation::FieldMismatch {
                        component: component.clone(),
                        field: field.clone(),
                        expected: *expected,
                    });
                }
            }
        }
        Ok(())
    }
}

fn default_required() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// A named role an action needs filled with an entity.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TargetSlotSpec {
    pub name: String,
    /// Scope id resolved through the scope oracle.
    pub scope: String,
    #[serde(default, alias = "dependsOn", skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(default = "default_required", skip_serializing_if = "is_true")]
    pub required: bool,
    #[serde(default, alias = "maxCombinations", skip_serializing_if = "Option::is_none")]
    pub max_combinations: Option<usize>,
    /// Whether the actor itself may fill this slot.
    #[serde(default, alias = "allowSelf")]
    pub allow_self: bool,
    #[serde(default, skip_serializing_if = "SlotValidation::is_empty")]
    pub validation: SlotValidation,
}

impl TargetSlotSpec {
    pub fn new(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: scope.into(),
            depends_on: None,
            required: true,
            max_combinations: None,
            allow_self: false,
            validation: SlotValidation::default(),
        }
    }

    #[must_use]
    pub fn depends_on(mut self, slot: impl Into<String>) -> Self {
        self.depends_on = Some(slot.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn with_max_combinations(mut self, limit: usize) -> Self {
        self.max_combinations = Some(limit);
        self
    }

    #[must_use]
    pub fn allowing_self(mut self) -> Self {
        self.allow_self = true;
        self
    }

    #[must_use]
    pub fn requires(mut self, component: impl Into<String>) -> Self {
        self.validation.required_components.insert(component);
        self
    }

    #[must_use]
    pub fn forbids(mut self, component: impl Into<String>) -> Self {
        self.validation.forbidden_components.insert(component);
        self
    }

    #[must_use]
    pub fn with_field(
        mut self,
        component: impl Into<String>,
        field: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        self.validation
            .component_fields
            .entry(component.into())
            .or_default()
            .insert(field.into(), kind);
        self
    }
}

/// A prerequisite logic rule with an optional display message.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PrerequisiteRule {
    pub logic: Logic,
    #[serde(default, alias = "failureMessage", skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl PrerequisiteRule {
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            failure_message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }
}

/// The canonical authored form of an action.
///
/// Loaders normalize every legacy source shape into this before the catalog
/// sees it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ActionSpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Command text with `{slot}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub required_components: RequirementSet,
    #[serde(default)]
    pub forbidden_components: RequirementSet,
    #[serde(default)]
    pub targets: Vec<TargetSlotSpec>,
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_combinations: Option<usize>,
    #[serde(default)]
    pub allow_optional_slots: bool,
}

impl ActionSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: None,
            template: None,
            required_components: RequirementSet::new(),
            forbidden_components: RequirementSet::new(),
            targets: Vec::new(),
            prerequisites: Vec::new(),
            max_combinations: None,
            allow_optional_slots: false,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    #[must_use]
    pub fn requires(mut self, component: impl Into<String>) -> Self {
        self.required_components.insert(component);
        self
    }

    #[must_use]
    pub fn forbids(mut self, component: impl Into<String>) -> Self {
        self.forbidden_components.insert(component);
        self
    }

    #[must_use]
    pub fn with_target(mut self, slot: TargetSlotSpec) -> Self {
        self.targets.push(slot);
        self
    }

    #[must_use]
    pub fn with_prerequisite(mut self, rule: PrerequisiteRule) -> Self {
        self.prerequisites.push(rule);
        self
    }

    #[must_use]
    pub fn with_max_combinations(mut self, limit: usize) -> Self {
        self.max_combinations = Some(limit);
        self
    }

    #[must_use]
    pub fn allowing_optional_slots(mut self) -> Self {
        self.allow_optional_slots = true;
        self
    }
}

/// A validated, immutable action definition.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionDefinition {
    spec: ActionSpec,
    /// Slot indices, dependencies first.
    resolution_order: Vec<usize>,
}

impl ActionDefinition {
    /// Validates `spec` and computes the slot resolution order.
    pub fn compile(spec: ActionSpec) -> Result<Self, DefinitionError> {
        if spec.id.trim().is_empty() {
            return Err(DefinitionError::EmptyId);
        }
        let action = || spec.id.clone();

        let overlap = spec
            .required_components
            .intersection(&spec.forbidden_components);
        if !overlap.is_empty() {
            return Err(DefinitionError::ComponentConflict {
                action: action(),
                components: overlap.to_vec(),
            });
        }
        if spec.max_combinations == Some(0) {
            return Err(DefinitionError::ZeroCombinationLimit {
                action: action(),
                slot: None,
            });
        }

        let mut positions = BTreeMap::new();
        for (index, slot) in spec.targets.iter().enumerate() {
            if slot.name.trim().is_empty() {
                return Err(DefinitionError::EmptySlotName { action: action() });
            }
            if positions.insert(slot.name.as_str(), index).is_some() {
                return Err(DefinitionError::DuplicateSlot {
                    action: action(),
                    slot: slot.name.clone(),
                });
            }
            if slot.scope.trim().is_empty() {
                return Err(DefinitionError::EmptyScope {
                    action: action(),
                    slot: slot.name.clone(),
                });
            }
            if slot.max_combinations == Some(0) {
                return Err(DefinitionError::ZeroCombinationLimit {
                    action: action(),
                    slot: Some(slot.name.clone()),
                });
            }
            let overlap = slot
                .validation
                .required_components
                .intersection(&slot.validation.forbidden_components);
            if !overlap.is_empty() {
                return Err(DefinitionError::SlotComponentConflict {
                    action: action(),
                    slot: slot.name.clone(),
                    components: overlap.to_vec(),
                });
            }
        }

        let mut dependencies = Vec::with_capacity(spec.targets.len());
        for slot in &spec.targets {
            let dependency = match &slot.depends_on {
                None => None,
                Some(name) => Some(*positions.get(name.as_str()).ok_or_else(|| {
                    DefinitionError::UnknownDependency {
                        action: action(),
                        slot: slot.name.clone(),
                        depends_on: name.clone(),
                    }
                })?),
            };
            dependencies.push(dependency);
        }

        let resolution_order = resolution_order(&dependencies).map_err(|start| {
            DefinitionError::DependencyCycle {
                action: action(),
                cycle: cycle_from(start, &dependencies)
                    .into_iter()
                    .map(|index| spec.targets[index].name.clone())
                    .collect(),
            }
        })?;

        Ok(Self {
            spec,
            resolution_order,
        })
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    /// Display name, falling back to the id.
    pub fn name(&self) -> &str {
        if self.spec.name.is_empty() {
            &self.spec.id
        } else {
            &self.spec.name
        }
    }

    /// The validated source spec.
    pub fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    /// Command template with `{slot}` placeholders, if any.
    pub fn template(&self) -> Option<&str> {
        self.spec.template.as_deref()
    }

    /// Components the actor must have.
    pub fn required_components(&self) -> &RequirementSet {
        &self.spec.required_components
    }

    /// Components the actor must not have.
    pub fn forbidden_components(&self) -> &RequirementSet {
        &self.spec.forbidden_components
    }

    /// Target slots in declaration order.
    pub fn targets(&self) -> &[TargetSlotSpec] {
        &self.spec.targets
    }

    /// Prerequisite rules in evaluation order.
    pub fn prerequisites(&self) -> &[PrerequisiteRule] {
        &self.spec.prerequisites
    }

    /// The action's own combination cap; `None` defers to the pipeline default.
    pub fn max_combinations(&self) -> Option<usize> {
        self.spec.max_combinations
    }

    /// Whether slots marked optional may be left unbound.
    pub fn allow_optional_slots(&self) -> bool {
        self.spec.allow_optional_slots
    }

    /// Looks a slot up by name.
    pub fn slot(&self, name: &str) -> Option<&TargetSlotSpec> {
        self.spec.targets.iter().find(|slot| slot.name == name)
    }

    /// Slots in the order they must be resolved.
    pub fn resolution_order(&self) -> impl Iterator<Item = &TargetSlotSpec> {
        self.resolution_order
            .iter()
            .map(|&index| &self.spec.targets[index])
    }
}

impl TryFrom<ActionSpec> for ActionDefinition {
    type Error = DefinitionError;

    fn try_from(spec: ActionSpec) -> Result<Self, Self::Error> {
        Self::compile(spec)
    }
}

/// Stable topological order: the lowest declared index whose dependency is
/// already placed goes next. Returns an unplaced index on a cycle.
fn resolution_order(dependencies: &[Option<usize>]) -> Result<Vec<usize>, usize> {
    let mut placed = vec![false; dependencies.len()];
    let mut order = Vec::with_capacity(dependencies.len());

    while order.len() < dependencies.len() {
        let next = (0..dependencies.len()).find(|&index| {
            !placed[index] && dependencies[index].is_none_or(|dependency| placed[dependency])
        });
        match next {
            Some(index) => {
                placed[index] = true;
                order.push(index);
            }
            None => {
                let stuck = (0..dependencies.len())
                    .find(|&index| !placed[index])
                    .unwrap_or_default();
                return Err(stuck);
            }
        }
    }
    Ok(order)
}

/// Follows dependencies from `start` until a slot repeats.
fn cycle_from(start: usize, dependencies: &[Option<usize>]) -> Vec<usize> {
    let mut walk = Vec::new();
    let mut seen = BTreeSet::new();
    let mut current = start;
    while seen.insert(current) {
        walk.push(current);
        match dependencies[current] {
            Some(next) => current = next,
            None => return walk,
        }
    }
    let begin = walk.iter().position(|&index| index == current).unwrap_or(0);
    let mut cycle = walk.split_off(begin);
    cycle.push(current);
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(definition: &ActionDefinition) -> Vec<&str> {
        definition
            .resolution_order()
            .map(|slot| slot.name.as_str())
            .collect()
    }

    #[test]
    fn dependencies_resolve_first() {
        let definition = ActionDefinition::compile(
            ActionSpec::new("core:unlock")
                .with_target(TargetSlotSpec::new("key", "core:keys").depends_on("container"))
                .with_target(TargetSlotSpec::new("container", "core:locked"))
                .with_target(TargetSlotSpec::new("witness", "core:here")),
        )
        .unwrap();
        assert_eq!(names(&definition), vec!["container", "key", "witness"]);
    }

    #[test]
    fn mutual_dependency_is_a_cycle() {
        let err = ActionDefinition::compile(
            ActionSpec::new("core:broken")
                .with_target(TargetSlotSpec::new("a", "core:here").depends_on("b"))
                .with_target(TargetSlotSpec::new("b", "core:here").depends_on("a")),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::DependencyCycle {
                action: "core:broken".into(),
                cycle: vec!["a".into(), "b".into(), "a".into()],
            }
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = ActionDefinition::compile(
            ActionSpec::new("core:loop")
                .with_target(TargetSlotSpec::new("a", "core:here").depends_on("a")),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::DependencyCycle { ref cycle, .. } if cycle == &["a", "a"]));
    }

    #[test]
    fn required_and_forbidden_overlap_is_rejected() {
        let err = ActionDefinition::compile(
            ActionSpec::new("core:odd")
                .requires("core:position")
                .forbids("core:position"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::ComponentConflict {
                action: "core:odd".into(),
                components: vec!["core:position".into()],
            }
        );
    }

    #[test]
    fn structural_errors() {
        let unknown = ActionDefinition::compile(
            ActionSpec::new("core:x").with_target(TargetSlotSpec::new("a", "s").depends_on("ghost")),
        );
        assert!(matches!(unknown, Err(DefinitionError::UnknownDependency { .. })));

        let duplicate = ActionDefinition::compile(
            ActionSpec::new("core:x")
                .with_target(TargetSlotSpec::new("a", "s"))
                .with_target(TargetSlotSpec::new("a", "t")),
        );
        assert!(matches!(duplicate, Err(DefinitionError::DuplicateSlot { .. })));

        let zero = ActionDefinition::compile(ActionSpec::new("core:x").with_max_combinations(0));
        assert!(matches!(zero, Err(DefinitionError::ZeroCombinationLimit { slot: None, .. })));

        let slot_conflict = ActionDefinition::compile(
            ActionSpec::new("core:x").with_target(TargetSlotSpec::new("a", "s").requires("c").forbids("c")),
        );
        assert!(matches!(slot_conflict, Err(DefinitionError::SlotComponentConflict { .. })));

        assert_eq!(ActionDefinition::compile(ActionSpec::new("  ")), Err(DefinitionError::EmptyId));
    }

    #[test]
    fn slot_validation_checks_shape() {
        let validation = TargetSlotSpec::new("item", "s")
            .requires("core:item")
            .forbids("core:fixed")
            .with_field("core:item", "weight", ValueKind::Number)
            .validation;

        let good = EntitySnapshot::new("core:apple").with_component("core:item", json!({ "weight": 0.2 }));
        assert_eq!(validation.check(&good), Ok(()));

        let untyped = EntitySnapshot::new("core:rock").with_component("core:item", json!({ "weight": "heavy" }));
        assert_eq!(
            validation.check(&untyped),
            Err(SlotViolation::FieldMismatch {
                component: "core:item".into(),
                field: "weight".into(),
                expected: ValueKind::Number,
            })
        );

        let fixed = good.clone().with_component("core:fixed", json!({}));
        assert!(matches!(validation.check(&fixed), Err(SlotViolation::ForbiddenComponent { .. })));
        assert!(matches!(
            validation.check(&EntitySnapshot::new("core:air")),
            Err(SlotViolation::MissingComponent { .. })
        ));
    }

    #[test]
    fn deserializes_camel_case_aliases() {
        let slot: TargetSlotSpec = serde_json::from_value(json!({
            "name": "key",
            "scope": "core:keys",
            "dependsOn": "container",
            "maxCombinations": 2
        }))
        .unwrap();
        assert_eq!(slot.depends_on.as_deref(), Some("container"));
        assert_eq!(slot.max_combinations, Some(2));
        assert!(slot.required);
        assert!(!slot.allow_self);
    }
}
