//! JSON-logic style boolean expressions.
//!
//! Prerequisites and scope filters are authored as JSON objects such as
//! `{"==": [{"var": "actor.components.core:stats.level"}, 3]}`. They are
//! parsed once into a [`LogicExpr`] tree when a definition is loaded and
//! evaluated many times against an [`EvaluationContext`].
//!
//! ## Operators
//!
//! | Operator | Arguments | Result |
//! |----------|-----------|--------|
//! | `var` | `path` or `[path, default]` | value at path, default or `null` |
//! | `and` / `or` | any | boolean, short-circuits left to right |
//! | `!` / `not`, `!!` | one | negated / cast truthiness |
//! | `==` `!=` `<` `<=` `>` `>=` | two | boolean |
//! | `in` | `[needle, array-or-string]` | boolean |
//! | `has_component` | `[entity, component-id]` | boolean |
//! | `is_co_located` | `[entity, entity]` | boolean |
//! | `count_at_location` | `[location, component-id?]` | number or `null` |
//! | `condition_ref` | `id` | value of the named condition |
//! | anything else | any | registered [`CustomOperator`] |
//!
//! ## Missing operands
//!
//! A `null` or unresolvable operand fails the predicate instead of raising an
//! error: every comparison (including `!=`) with a `null` side is `false`,
//! `in` with a `null` needle or haystack is `false`, `has_component` and
//! `is_co_located` on an unknown entity are `false`, and an entity without
//! `core:position.locationId` is never co-located. `count_at_location` with a
//! non-string location yields `null`, so any comparison against it fails.

mod conditions;
mod context;
mod error;
mod evaluate;
mod explain;
mod operators;

pub use conditions::ConditionRegistry;
pub use context::EvaluationContext;
pub use error::LogicError;
pub use evaluate::{Evaluator, is_truthy};
pub use explain::Explanation;
pub use operators::{BUILTIN_OPERATORS, CustomOperator, OperatorRegistry};

use serde_json::Value;

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum CompareOp {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

/// Reference to an entity inside an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityRef {
    /// A context path (`actor`, `entity`, `target`, `targets.<slot>`) or,
    /// failing that, a literal entity id.
    Path(String),
    /// An expression that evaluates to an entity id.
    Expr(Box<LogicExpr>),
}

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicExpr {
    Literal(Value),
    Array(Vec<LogicExpr>),
    Var {
        path: String,
        default: Option<Box<LogicExpr>>,
    },
    And(Vec<LogicExpr>),
    Or(Vec<LogicExpr>),
    Not(Box<LogicExpr>),
    Truthy(Box<LogicExpr>),
    Compare {
        op: CompareOp,
        left: Box<LogicExpr>,
        right: Box<LogicExpr>,
    },
    In {
        needle: Box<LogicExpr>,
        haystack: Box<LogicExpr>,
    },
    HasComponent {
        entity: EntityRef,
        component: String,
    },
    CoLocated(EntityRef, EntityRef),
    CountAtLocation {
        location: Box<LogicExpr>,
        component: Option<String>,
    },
    ConditionRef(String),
    Custom {
        name: String,
        args: Vec<LogicExpr>,
    },
}

impl LogicExpr {
    /// Parses a JSON value into an expression tree.
    ///
    /// Single-key objects are operator applications, arrays are evaluated
    /// element-wise and everything else is a literal.
    pub fn parse(value: &Value) -> Result<Self, LogicError> {
        match value {
            Value::Object(map) if map.len() == 1 => {
                let Some((op, args)) = map.iter().next() else {
                    return Ok(Self::Literal(value.clone()));
                };
                Self::parse_operator(op, args)
            }
            Value::Array(items) => Ok(Self::Array(
                items.iter().map(Self::parse).collect::<Result<_, _>>()?,
            )),
            other => Ok(Self::Literal(other.clone())),
        }
    }

    fn parse_operator(op: &str, args: &Value) -> Result<Self, LogicError> {
        let list = arguments(args);

        match op {
            "var" => {
                let path = match list.first() {
                    None => String::new(),
                    Some(Value::String(path)) => path.clone(),
                    Some(Value::Number(index)) => index.to_string(),
                    Some(other) => {
                        return Err(LogicError::Malformed(format!(
                            "var path must be a string, found {other}"
                        )));
                    }
                };
                let default = match list.get(1) {
                    Some(default) => Some(Box::new(Self::parse(default)?)),
                    None => None,
                };
                Ok(Self::Var { path, default })
            }
            "and" => Ok(Self::And(parse_all(&list)?)),
            "or" => Ok(Self::Or(parse_all(&list)?)),
            "!" | "not" => {
                let [inner] = exact::<1>(op, &list)?;
                Ok(Self::Not(Box::new(Self::parse(inner)?)))
            }
            "!!" => {
                let [inner] = exact::<1>(op, &list)?;
                Ok(Self::Truthy(Box::new(Self::parse(inner)?)))
            }
            "==" | "===" | "!=" | "!==" | "<" | "<=" | ">" | ">=" => {
                let [left, right] = exact::<2>(op, &list)?;
                let op = match op {
                    "==" | "===" => CompareOp::Eq,
                    "!=" | "!==" => CompareOp::Ne,
                    "<" => CompareOp::Lt,
                    "<=" => CompareOp::Le,
                    ">" => CompareOp::Gt,
                    _ => CompareOp::Ge,
                };
                Ok(Self::Compare {
                    op,
                    left: Box::new(Self::parse(left)?),
                    right: Box::new(Self::parse(right)?),
                })
            }
            "in" => {
                let [needle, haystack] = exact::<2>(op, &list)?;
                Ok(Self::In {
                    needle: Box::new(Self::parse(needle)?),
                    haystack: Box::new(Self::parse(haystack)?),
                })
            }
            "has_component" => {
                let [entity, component] = exact::<2>(op, &list)?;
                let component = component.as_str().ok_or_else(|| {
                    LogicError::Malformed("has_component expects a component id string".into())
                })?;
                Ok(Self::HasComponent {
                    entity: parse_entity_ref(entity)?,
                    component: component.to_owned(),
                })
            }
            "is_co_located" | "co_located" => {
                let [a, b] = exact::<2>(op, &list)?;
                Ok(Self::CoLocated(parse_entity_ref(a)?, parse_entity_ref(b)?))
            }
            "count_at_location" => {
                let (location, component) = match list.as_slice() {
                    [location] => (*location, None),
                    [location, component] => (*location, Some(*component)),
                    _ => {
                        return Err(LogicError::Arity {
                            op: op.to_owned(),
                            expected: "1 or 2",
                            found: list.len(),
                        });
                    }
                };
                let component = match component {
                    None => None,
                    Some(Value::String(id)) => Some(id.clone()),
                    Some(_) => {
                        return Err(LogicError::Malformed(
                            "count_at_location component filter must be a string".into(),
                        ));
                    }
                };
                Ok(Self::CountAtLocation {
                    location: Box::new(Self::parse(location)?),
                    component,
                })
            }
            "condition_ref" => {
                let [id] = exact::<1>(op, &list)?;
                let id = id.as_str().ok_or_else(|| {
                    LogicError::Malformed("condition_ref expects a condition id string".into())
                })?;
                Ok(Self::ConditionRef(id.to_owned()))
            }
            name => Ok(Self::Custom {
                name: name.to_owned(),
                args: parse_all(&list)?,
            }),
        }
    }
}

fn arguments(args: &Value) -> Vec<&Value> {
    match args {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    }
}

fn parse_all(list: &[&Value]) -> Result<Vec<LogicExpr>, LogicError> {
    list.iter().map(|value| LogicExpr::parse(value)).collect()
}

fn exact<'v, const N: usize>(op: &str, list: &[&'v Value]) -> Result<[&'v Value; N], LogicError> {
    <[&Value; N]>::try_from(list).map_err(|_| LogicError::Arity {
        op: op.to_owned(),
        expected: match N {
            1 => "1",
            _ => "2",
        },
        found: list.len(),
    })
}

fn parse_entity_ref(value: &Value) -> Result<EntityRef, LogicError> {
    match value {
        Value::String(path) => Ok(EntityRef::Path(path.clone())),
        other => Ok(EntityRef::Expr(Box::new(LogicExpr::parse(other)?))),
    }
}

/// A parsed expression together with the JSON it was authored as.
///
/// The source is kept so failure diagnostics can show the rule exactly as
/// written.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Logic {
    source: Value,
    root: LogicExpr,
}

impl Logic {
    pub fn parse(source: Value) -> Result<Self, LogicError> {
        let root = LogicExpr::parse(&source)?;
        Ok(Self { source, root })
    }

    pub fn source(&self) -> &Value {
        &self.source
    }

    pub fn root(&self) -> &LogicExpr {
        &self.root
    }
}

impl TryFrom<Value> for Logic {
    type Error = LogicError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Logic> for Value {
    fn from(logic: Logic) -> Self {
        logic.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_operators() {
        let expr = LogicExpr::parse(&json!({
            "and": [
                { "has_component": ["actor", "core:position"] },
                { ">=": [{ "var": "actor.components.core:stats.level" }, 3] }
            ]
        }))
        .unwrap();

        let LogicExpr::And(children) = expr else {
            panic!("expected and");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0], LogicExpr::HasComponent { .. }));
        assert!(matches!(
            children[1],
            LogicExpr::Compare {
                op: CompareOp::Ge,
                ..
            }
        ));
    }

    #[test]
    fn not_accepts_bare_or_wrapped_argument() {
        let bare = LogicExpr::parse(&json!({ "!": { "var": "x" } })).unwrap();
        let wrapped = LogicExpr::parse(&json!({ "!": [{ "var": "x" }] })).unwrap();
        assert_eq!(bare, wrapped);
    }

    #[test]
    fn comparison_arity_is_checked() {
        let err = LogicExpr::parse(&json!({ "==": [1] })).unwrap_err();
        assert!(matches!(err, LogicError::Arity { found: 1, .. }));
    }

    #[test]
    fn unknown_operator_parses_as_custom() {
        let expr = LogicExpr::parse(&json!({ "is_hungry": ["actor"] })).unwrap();
        assert!(matches!(expr, LogicExpr::Custom { ref name, .. } if name == "is_hungry"));
    }

    #[test]
    fn multi_key_object_is_literal() {
        let expr = LogicExpr::parse(&json!({ "a": 1, "b": 2 })).unwrap();
        assert!(matches!(expr, LogicExpr::Literal(_)));
    }

    #[test]
    fn logic_round_trips_source() {
        let source = json!({ "condition_ref": "core:actor-can-move" });
        let logic: Logic = serde_json::from_value(source.clone()).unwrap();
        assert_eq!(logic.source(), &source);
        assert_eq!(serde_json::to_value(&logic).unwrap(), source);
    }
}
