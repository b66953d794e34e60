//! Host-registered predicates.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::{EvaluationContext, LogicError};

/// Operator names handled by the evaluator itself.
pub const BUILTIN_OPERATORS: &[&str] = &[
    "var",
    "and",
    "or",
    "!",
    "not",
    "!!",
    "==",
    "===",
    "!=",
    "!==",
    "<",
    "<=",
    ">",
    ">=",
    "in",
    "has_component",
    "is_co_located",
    "co_located",
    "count_at_location",
    "condition_ref",
];

/// A deterministic, side-effect free predicate callable from expressions.
///
/// Arguments are evaluated before the call. Returning `Err` fails the rule
/// that invoked the operator; it never aborts the pipeline.
pub trait CustomOperator: Send + Sync {
    /// The operator key as written in expressions.
    fn name(&self) -> &str;

    fn evaluate(&self, args: &[Value], ctx: &EvaluationContext<'_>) -> Result<Value, LogicError>;
}

/// Registry of custom operators keyed by name.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: BTreeMap<String, Arc<dyn CustomOperator>>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operator, replacing any previous one with the same name.
    ///
    /// Built-in names are rejected since expressions using them never reach
    /// the registry.
    pub fn register(&mut self, operator: impl CustomOperator + 'static) -> Result<(), LogicError> {
        let name = operator.name().to_owned();
        if BUILTIN_OPERATORS.contains(&name.as_str()) {
            return Err(LogicError::ReservedOperator(name));
        }
        self.operators.insert(name, Arc::new(operator));
        Ok(())
    }

    /// Looks an operator up by the name used in expressions.
    pub fn get(&self, name: &str) -> Option<&dyn CustomOperator> {
        self.operators.get(name).map(|operator| operator.as_ref())
    }

    /// Registered operator names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl core::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(&'static str);

    impl CustomOperator for Always {
        fn name(&self) -> &str {
            self.0
        }

        fn evaluate(&self, _args: &[Value], _ctx: &EvaluationContext<'_>) -> Result<Value, LogicError> {
            Ok(Value::Bool(true))
        }
    }

    #[test]
    fn builtin_names_are_reserved() {
        let mut registry = OperatorRegistry::new();
        assert_eq!(
            registry.register(Always("has_component")),
            Err(LogicError::ReservedOperator("has_component".into()))
        );
        assert!(registry.register(Always("is_hungry")).is_ok());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["is_hungry"]);
    }
}
