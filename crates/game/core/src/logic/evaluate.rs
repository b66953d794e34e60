//! Expression evaluation.

use std::cmp::Ordering;

use serde_json::Value;

use super::{CompareOp, EntityRef, EvaluationContext, Logic, LogicError, LogicExpr};
use crate::config::PipelineConfig;
use crate::env::Env;
use crate::state::{EntityId, EntitySnapshot};

/// JSON-logic truthiness: `null`, `false`, `0`, `""` and `[]` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Evaluates expressions against an [`Env`].
///
/// Evaluation is deterministic and side-effect free; the only external reads
/// are entity lookups, named conditions and registered custom operators.
#[derive(Clone, Copy, Debug)]
pub struct Evaluator<'a> {
    env: Env<'a>,
    max_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: Env<'a>) -> Self {
        Self {
            env,
            max_depth: PipelineConfig::DEFAULT_MAX_CONDITION_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn env(&self) -> &Env<'a> {
        &self.env
    }

    /// Evaluates `logic` to a JSON value.
    pub fn evaluate(&self, logic: &Logic, ctx: &EvaluationContext<'_>) -> Result<Value, LogicError> {
        self.eval(logic.root(), ctx, 0)
    }

    /// Evaluates `logic` and applies truthiness.
    pub fn test(&self, logic: &Logic, ctx: &EvaluationContext<'_>) -> Result<bool, LogicError> {
        Ok(is_truthy(&self.evaluate(logic, ctx)?))
    }

    pub(super) fn eval(
        &self,
        expr: &LogicExpr,
        ctx: &EvaluationContext<'_>,
        depth: usize,
    ) -> Result<Value, LogicError> {
        match expr {
            LogicExpr::Literal(value) => Ok(value.clone()),

            LogicExpr::Array(items) => items
                .iter()
                .map(|item| self.eval(item, ctx, depth))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            LogicExpr::Var { path, default } => match ctx.resolve(path) {
                Some(value) if !value.is_null() => Ok(value),
                _ => match default {
                    Some(default) => self.eval(default, ctx, depth),
                    None => Ok(Value::Null),
                },
            },

            LogicExpr::And(children) => {
                for child in children {
                    if !is_truthy(&self.eval(child, ctx, depth)?) {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }

            LogicExpr::Or(children) => {
                for child in children {
                    if is_truthy(&self.eval(child, ctx, depth)?) {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }

            LogicExpr::Not(inner) => Ok(Value::Bool(!is_truthy(&self.eval(inner, ctx, depth)?))),

            LogicExpr::Truthy(inner) => Ok(Value::Bool(is_truthy(&self.eval(inner, ctx, depth)?))),

            LogicExpr::Compare { op, left, right } => {
                let left = self.eval(left, ctx, depth)?;
                let right = self.eval(right, ctx, depth)?;
                Ok(Value::Bool(compare(*op, &left, &right)))
            }

            LogicExpr::In { needle, haystack } => {
                let needle = self.eval(needle, ctx, depth)?;
                let haystack = self.eval(haystack, ctx, depth)?;
                Ok(Value::Bool(contains(&needle, &haystack)))
            }

            LogicExpr::HasComponent { entity, component } => {
                let present = self
                    .with_entity(entity, ctx, depth, |entity| entity.has_component(component))?
                    .unwrap_or(false);
                Ok(Value::Bool(present))
            }

            LogicExpr::CoLocated(a, b) => {
                let first = self.with_entity(a, ctx, depth, |e| e.location().map(str::to_owned))?;
                let second = self.with_entity(b, ctx, depth, |e| e.location().map(str::to_owned))?;
                let co_located = match (first.flatten(), second.flatten()) {
                    (Some(first), Some(second)) => first == second,
                    _ => false,
                };
                Ok(Value::Bool(co_located))
            }

            LogicExpr::CountAtLocation {
                location,
                component,
            } => {
                let location = self.eval(location, ctx, depth)?;
                let Some(location) = location.as_str() else {
                    return Ok(Value::Null);
                };
                let entities = self.env.entities();
                let ids = entities.entities_at(location)?;
                let count = match component {
                    None => ids.len(),
                    Some(component) => {
                        let mut count = 0usize;
                        for id in &ids {
                            if entities.has_component(id, component)? {
                                count += 1;
                            }
                        }
                        count
                    }
                };
                Ok(Value::from(count))
            }

            LogicExpr::ConditionRef(id) => {
                let condition = self.condition(id, depth)?;
                self.eval(condition.root(), ctx, depth + 1)
            }

            LogicExpr::Custom { name, args } => {
                let operator = self
                    .env
                    .operators()
                    .and_then(|registry| registry.get(name))
                    .ok_or_else(|| LogicError::UnknownOperator(name.clone()))?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, ctx, depth))
                    .collect::<Result<Vec<_>, _>>()?;
                operator.evaluate(&args, ctx)
            }
        }
    }

    /// Looks up a named condition, enforcing the reference depth limit.
    pub(super) fn condition(&self, id: &str, depth: usize) -> Result<&'a Logic, LogicError> {
        if depth >= self.max_depth {
            return Err(LogicError::ConditionDepthExceeded {
                id: id.to_owned(),
                max_depth: self.max_depth,
            });
        }
        self.env
            .conditions()
            .and_then(|conditions| conditions.condition(id))
            .ok_or_else(|| LogicError::UnknownCondition(id.to_owned()))
    }

    /// Applies `f` to the referenced entity; `Ok(None)` when it cannot be found.
    pub(super) fn with_entity<R>(
        &self,
        entity: &EntityRef,
        ctx: &EvaluationContext<'_>,
        depth: usize,
        f: impl FnOnce(&EntitySnapshot) -> R,
    ) -> Result<Option<R>, LogicError> {
        let id = match entity {
            EntityRef::Path(path) => {
                if let Some(found) = ctx.entity_at(path) {
                    return Ok(Some(f(found)));
                }
                EntityId::from(path.as_str())
            }
            EntityRef::Expr(expr) => match self.eval(expr, ctx, depth)? {
                Value::String(id) => EntityId::from(id),
                _ => return Ok(None),
            },
        };
        Ok(self.env.entities().entity(&id)?.map(f))
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    match op {
        CompareOp::Eq => loose_eq(left, right),
        CompareOp::Ne => !loose_eq(left, right),
        CompareOp::Lt => ordering(left, right) == Some(Ordering::Less),
        CompareOp::Le => matches!(
            ordering(left, right),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => ordering(left, right) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            ordering(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

/// Equality with numeric normalization (`1 == 1.0`); no string coercion.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

/// Ordering between two numbers or two strings; anything else is unordered.
fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn contains(needle: &Value, haystack: &Value) -> bool {
    if needle.is_null() {
        return false;
    }
    match haystack {
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        Value::String(text) => needle.as_str().is_some_and(|needle| text.contains(needle)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{ConditionRegistry, CustomOperator, OperatorRegistry};
    use crate::scope::ScopeRegistry;
    use crate::state::{EntityStore, WorldContext, components};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn logic(value: Value) -> Logic {
        Logic::parse(value).unwrap()
    }

    fn placed(id: &str, location: &str) -> EntitySnapshot {
        EntitySnapshot::new(id)
            .with_component(components::POSITION, json!({ "locationId": location }))
    }

    fn fixture() -> (EntityStore, ScopeRegistry) {
        let store = EntityStore::from_entities([
            placed("core:hero", "core:hall").with_component("core:stats", json!({ "level": 3 })),
            placed("core:goblin", "core:hall").with_component("core:hostile", json!({})),
            placed("core:rat", "core:hall").with_component("core:hostile", json!({})),
            placed("core:cat", "core:yard"),
            EntitySnapshot::new("core:nowhere"),
        ]);
        (store, ScopeRegistry::new())
    }

    fn check(store: &EntityStore, scopes: &ScopeRegistry, rule: Value, target: &str) -> Value {
        let world = WorldContext::new(7);
        let env = Env::new(store, scopes).with_world(&world);
        let evaluator = Evaluator::new(env);
        let actor = store.get("core:hero").unwrap();
        let target = store.get(target);
        let ctx = EvaluationContext::new(actor, &world).with_target(target);
        evaluator.evaluate(&logic(rule), &ctx).unwrap()
    }

    #[test]
    fn comparisons_with_null_operands_fail() {
        let (store, scopes) = fixture();
        for op in ["==", "!=", "<", "<=", ">", ">="] {
            let mut rule = serde_json::Map::new();
            rule.insert(op.to_owned(), json!([{ "var": "actor.components.core:missing.x" }, 1]));
            let rule = Value::Object(rule);
            assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(false), "{op}");
        }
    }

    #[test]
    fn numeric_equality_normalizes_floats() {
        let (store, scopes) = fixture();
        let rule = json!({ "==": [{ "var": "actor.components.core:stats.level" }, 3.0] });
        assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(true));
        let rule = json!({ "==": ["3", 3] });
        assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(false));
    }

    #[test]
    fn var_default_applies_to_missing_values() {
        let (store, scopes) = fixture();
        let rule = json!({ ">=": [{ "var": ["actor.components.core:stats.xp", 0] }, 0] });
        assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(true));
    }

    #[test]
    fn has_component_on_unknown_entity_is_false() {
        let (store, scopes) = fixture();
        let rule = json!({ "has_component": ["target", "core:hostile"] });
        assert_eq!(check(&store, &scopes, rule.clone(), "core:goblin"), json!(true));
        assert_eq!(check(&store, &scopes, rule, "core:ghost"), json!(false));

        let by_id = json!({ "has_component": ["core:rat", "core:hostile"] });
        assert_eq!(check(&store, &scopes, by_id, "core:goblin"), json!(true));
    }

    #[test]
    fn co_location_requires_both_positions() {
        let (store, scopes) = fixture();
        let rule = json!({ "is_co_located": ["actor", "target"] });
        assert_eq!(check(&store, &scopes, rule.clone(), "core:goblin"), json!(true));
        assert_eq!(check(&store, &scopes, rule.clone(), "core:cat"), json!(false));
        assert_eq!(check(&store, &scopes, rule, "core:nowhere"), json!(false));
    }

    #[test]
    fn count_at_location_filters_by_component() {
        let (store, scopes) = fixture();
        let location = json!({ "var": "actor.components.core:position.locationId" });
        let rule = json!({ "count_at_location": [location.clone(), "core:hostile"] });
        assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(2));

        let rule = json!({ ">=": [{ "count_at_location": [location] }, 3] });
        assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(true));

        let missing = json!({ ">=": [{ "count_at_location": [{ "var": "target.components.core:position.locationId" }] }, 0] });
        assert_eq!(check(&store, &scopes, missing, "core:nowhere"), json!(false));
    }

    #[test]
    fn in_operator_handles_arrays_and_strings() {
        let (store, scopes) = fixture();
        let rule = json!({ "in": ["b", ["a", "b"]] });
        assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(true));
        let rule = json!({ "in": ["gob", { "var": "target.id" }] });
        assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(true));
        let rule = json!({ "in": [null, [null]] });
        assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(false));
    }

    #[test]
    fn world_values_are_visible() {
        let (store, scopes) = fixture();
        let rule = json!({ ">": [{ "var": "world.turn" }, 5] });
        assert_eq!(check(&store, &scopes, rule, "core:goblin"), json!(true));
    }

    #[test]
    fn condition_refs_expand_and_guard_depth() {
        let (store, scopes) = fixture();
        let mut conditions = ConditionRegistry::new();
        conditions.insert("core:leveled", logic(json!({ ">=": [{ "var": "actor.components.core:stats.level" }, 2] })));
        conditions.insert("core:loop", logic(json!({ "condition_ref": "core:loop" })));

        let world = WorldContext::default();
        let env = Env::new(&store, &scopes).with_conditions(&conditions);
        let evaluator = Evaluator::new(env).with_max_depth(4);
        let actor = store.get("core:hero").unwrap();
        let ctx = EvaluationContext::new(actor, &world);

        let ok = evaluator.test(&logic(json!({ "condition_ref": "core:leveled" })), &ctx);
        assert_eq!(ok, Ok(true));

        let looped = evaluator.test(&logic(json!({ "condition_ref": "core:loop" })), &ctx);
        assert!(matches!(looped, Err(LogicError::ConditionDepthExceeded { max_depth: 4, .. })));

        let unknown = evaluator.test(&logic(json!({ "condition_ref": "core:nope" })), &ctx);
        assert_eq!(unknown, Err(LogicError::UnknownCondition("core:nope".into())));
    }

    struct CountingOperator(Arc<AtomicUsize>);

    impl CustomOperator for CountingOperator {
        fn name(&self) -> &str {
            "count_calls"
        }

        fn evaluate(&self, _args: &[Value], _ctx: &EvaluationContext<'_>) -> Result<Value, LogicError> {
            self.0.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Value::Bool(true))
        }
    }

    #[test]
    fn and_short_circuits_before_custom_operator() {
        let (store, scopes) = fixture();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut operators = OperatorRegistry::new();
        operators.register(CountingOperator(Arc::clone(&calls))).unwrap();

        let world = WorldContext::default();
        let env = Env::new(&store, &scopes).with_operators(&operators);
        let evaluator = Evaluator::new(env);
        let actor = store.get("core:hero").unwrap();
        let ctx = EvaluationContext::new(actor, &world);

        let rule = logic(json!({ "and": [false, { "count_calls": [] }] }));
        assert_eq!(evaluator.test(&rule, &ctx), Ok(false));
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);

        let rule = logic(json!({ "or": [false, { "count_calls": [] }] }));
        assert_eq!(evaluator.test(&rule, &ctx), Ok(true));
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn unregistered_custom_operator_is_an_error() {
        let (store, scopes) = fixture();
        let world = WorldContext::default();
        let evaluator = Evaluator::new(Env::new(&store, &scopes));
        let actor = store.get("core:hero").unwrap();
        let ctx = EvaluationContext::new(actor, &world);

        let result = evaluator.test(&logic(json!({ "is_hungry": ["actor"] })), &ctx);
        assert_eq!(result, Err(LogicError::UnknownOperator("is_hungry".into())));
    }

    #[test]
    fn truthiness_table() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!("no")));
    }
}
