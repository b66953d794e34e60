//! Human-readable diagnostics for failed expressions.

use std::collections::BTreeMap;

use serde_json::Value;

use super::evaluate::is_truthy;
use super::{EntityRef, EvaluationContext, Evaluator, Logic, LogicExpr};
use crate::state::components;

/// Why an expression evaluated falsy, as far as it can be derived.
///
/// `expected`/`actual` are filled for the operator that decided the result:
/// the right/left operands of a comparison, the component id of a
/// `has_component`, and so on. `context` maps every path the expression reads
/// to its value at evaluation time (`null` when unresolved).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Explanation {
    pub operator: Option<String>,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
    pub context: BTreeMap<String, Value>,
}

impl Evaluator<'_> {
    /// Explains the outcome of `logic` for `ctx`.
    ///
    /// Re-evaluates sub-expressions, so it is only called on the failure path.
    pub fn explain(&self, logic: &Logic, ctx: &EvaluationContext<'_>) -> Explanation {
        let mut explanation = Explanation::default();
        self.explain_expr(logic.root(), ctx, 0, &mut explanation);
        self.collect_references(logic.root(), ctx, 0, &mut explanation.context);
        explanation
    }

    fn explain_expr(
        &self,
        expr: &LogicExpr,
        ctx: &EvaluationContext<'_>,
        depth: usize,
        out: &mut Explanation,
    ) {
        match expr {
            LogicExpr::Compare { op, left, right } => {
                out.operator = Some(op.to_string());
                out.actual = self.eval(left, ctx, depth).ok();
                out.expected = self.eval(right, ctx, depth).ok();
            }
            LogicExpr::HasComponent { entity, component } => {
                out.operator = Some("has_component".into());
                out.expected = Some(Value::String(component.clone()));
                out.actual = self
                    .with_entity(entity, ctx, depth, |e| e.has_component(component))
                    .ok()
                    .map(|present| Value::Bool(present.unwrap_or(false)));
            }
            LogicExpr::CoLocated(a, b) => {
                let location = |entity: &EntityRef| {
                    self.with_entity(entity, ctx, depth, |e| e.location().map(str::to_owned))
                        .ok()
                        .flatten()
                        .flatten()
                        .map_or(Value::Null, Value::String)
                };
                out.operator = Some("is_co_located".into());
                out.expected = Some(location(a));
                out.actual = Some(location(b));
            }
            LogicExpr::Not(inner) => {
                out.operator = Some("!".into());
                out.expected = Some(Value::Bool(false));
                out.actual = self
                    .eval(inner, ctx, depth)
                    .ok()
                    .map(|value| Value::Bool(is_truthy(&value)));
            }
            LogicExpr::And(children) => {
                let failing = children.iter().find(|child| {
                    self.eval(child, ctx, depth)
                        .map_or(true, |value| !is_truthy(&value))
                });
                match failing {
                    Some(child) => self.explain_expr(child, ctx, depth, out),
                    None => out.operator = Some("and".into()),
                }
            }
            LogicExpr::ConditionRef(id) => match self.condition(id, depth) {
                Ok(condition) => self.explain_expr(condition.root(), ctx, depth + 1, out),
                Err(_) => out.operator = Some("condition_ref".into()),
            },
            LogicExpr::Or(_) => {
                out.operator = Some("or".into());
                out.expected = Some(Value::Bool(true));
                out.actual = Some(Value::Bool(false));
            }
            LogicExpr::Custom { name, .. } => {
                out.operator = Some(name.clone());
                out.actual = self.eval(expr, ctx, depth).ok();
            }
            other => out.actual = self.eval(other, ctx, depth).ok(),
        }
    }

    fn collect_references(
        &self,
        expr: &LogicExpr,
        ctx: &EvaluationContext<'_>,
        depth: usize,
        out: &mut BTreeMap<String, Value>,
    ) {
        match expr {
            LogicExpr::Literal(_) => {}
            LogicExpr::Var { path, default } => {
                out.insert(path.clone(), ctx.resolve(path).unwrap_or(Value::Null));
                if let Some(default) = default {
                    self.collect_references(default, ctx, depth, out);
                }
            }
            LogicExpr::Array(children)
            | LogicExpr::And(children)
            | LogicExpr::Or(children)
            | LogicExpr::Custom { args: children, .. } => {
                for child in children {
                    self.collect_references(child, ctx, depth, out);
                }
            }
            LogicExpr::Not(inner) | LogicExpr::Truthy(inner) => {
                self.collect_references(inner, ctx, depth, out);
            }
            LogicExpr::Compare { left, right, .. } => {
                self.collect_references(left, ctx, depth, out);
                self.collect_references(right, ctx, depth, out);
            }
            LogicExpr::In { needle, haystack } => {
                self.collect_references(needle, ctx, depth, out);
                self.collect_references(haystack, ctx, depth, out);
            }
            LogicExpr::HasComponent { entity, .. } => {
                if let EntityRef::Path(path) = entity {
                    let present = ctx
                        .entity_at(path)
                        .map(|e| Value::from(e.components.keys().cloned().collect::<Vec<_>>()))
                        .unwrap_or(Value::Null);
                    out.insert(format!("{path}.componentIds"), present);
                }
                self.collect_entity_ref(entity, ctx, depth, out);
            }
            LogicExpr::CoLocated(a, b) => {
                for entity in [a, b] {
                    if let EntityRef::Path(path) = entity {
                        let key = format!(
                            "{path}.components.{}.{}",
                            components::POSITION,
                            components::POSITION_LOCATION
                        );
                        let value = ctx
                            .entity_at(path)
                            .and_then(|e| e.location())
                            .map_or(Value::Null, |location| Value::String(location.to_owned()));
                        out.insert(key, value);
                    }
                    self.collect_entity_ref(entity, ctx, depth, out);
                }
            }
            LogicExpr::CountAtLocation { location, .. } => {
                self.collect_references(location, ctx, depth, out);
            }
            LogicExpr::ConditionRef(id) => {
                if let Ok(condition) = self.condition(id, depth) {
                    self.collect_references(condition.root(), ctx, depth + 1, out);
                }
            }
        }
    }

    fn collect_entity_ref(
        &self,
        entity: &EntityRef,
        ctx: &EvaluationContext<'_>,
        depth: usize,
        out: &mut BTreeMap<String, Value>,
    ) {
        if let EntityRef::Expr(expr) = entity {
            self.collect_references(expr, ctx, depth, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Env;
    use crate::scope::ScopeRegistry;
    use crate::state::{EntitySnapshot, EntityStore, WorldContext};
    use serde_json::json;

    #[test]
    fn comparison_reports_expected_and_actual() {
        let store = EntityStore::from_entities([
            EntitySnapshot::new("core:hero").with_component("core:stats", json!({ "level": 1 })),
        ]);
        let scopes = ScopeRegistry::new();
        let world = WorldContext::default();
        let evaluator = Evaluator::new(Env::new(&store, &scopes));
        let ctx = EvaluationContext::new(store.get("core:hero").unwrap(), &world);

        let rule = Logic::parse(json!({
            "and": [
                { "has_component": ["actor", "core:stats"] },
                { ">=": [{ "var": "actor.components.core:stats.level" }, 5] }
            ]
        }))
        .unwrap();
        let explanation = evaluator.explain(&rule, &ctx);

        assert_eq!(explanation.operator.as_deref(), Some(">="));
        assert_eq!(explanation.actual, Some(json!(1)));
        assert_eq!(explanation.expected, Some(json!(5)));
        assert_eq!(
            explanation.context.get("actor.components.core:stats.level"),
            Some(&json!(1))
        );
        assert_eq!(
            explanation.context.get("actor.componentIds"),
            Some(&json!(["core:stats"]))
        );
    }

    #[test]
    fn missing_component_is_explained() {
        let store = EntityStore::from_entities([EntitySnapshot::new("core:hero")]);
        let scopes = ScopeRegistry::new();
        let world = WorldContext::default();
        let evaluator = Evaluator::new(Env::new(&store, &scopes));
        let ctx = EvaluationContext::new(store.get("core:hero").unwrap(), &world);

        let rule = Logic::parse(json!({ "has_component": ["actor", "core:magic"] })).unwrap();
        let explanation = evaluator.explain(&rule, &ctx);

        assert_eq!(explanation.expected, Some(json!("core:magic")));
        assert_eq!(explanation.actual, Some(json!(false)));
    }
}
