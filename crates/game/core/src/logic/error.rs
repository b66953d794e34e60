//! Logic expression errors.

use crate::error::{ErrorSeverity, GameError};
use crate::state::StoreError;

/// Errors raised while parsing or evaluating a logic expression.
///
/// Parse-time variants surface when a definition is loaded. Evaluation-time
/// variants are recorded as a failed rule or a failed scope filter, except
/// [`LogicError::Store`], which ends the run.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LogicError {
    /// The expression shape is not valid logic.
    #[error("malformed expression: {0}")]
    Malformed(String),

    /// An operator received the wrong number of arguments.
    #[error("operator '{op}' expects {expected} argument(s), found {found}")]
    Arity {
        op: String,
        expected: &'static str,
        found: usize,
    },

    /// A custom operator name is not registered.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// A custom operator tried to shadow a built-in.
    #[error("operator '{0}' is built in and cannot be replaced")]
    ReservedOperator(String),

    /// A `condition_ref` names a condition that does not exist.
    #[error("unknown condition '{0}'")]
    UnknownCondition(String),

    /// `condition_ref` expansion nested deeper than the configured limit.
    #[error("condition '{id}' exceeds maximum reference depth {max_depth}")]
    ConditionDepthExceeded { id: String, max_depth: usize },

    /// A custom operator reported a failure.
    #[error("operator '{op}' failed: {message}")]
    OperatorFailed { op: String, message: String },

    /// The entity store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LogicError {
    /// The store failure behind this error, if it is one.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl GameError for LogicError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Malformed(_) | Self::Arity { .. } | Self::ReservedOperator(_) => {
                ErrorSeverity::Validation
            }
            Self::UnknownOperator(_)
            | Self::UnknownCondition(_)
            | Self::ConditionDepthExceeded { .. }
            | Self::OperatorFailed { .. } => ErrorSeverity::Recoverable,
            Self::Store(_) => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "LOGIC_MALFORMED",
            Self::Arity { .. } => "LOGIC_ARITY",
            Self::UnknownOperator(_) => "LOGIC_UNKNOWN_OPERATOR",
            Self::ReservedOperator(_) => "LOGIC_RESERVED_OPERATOR",
            Self::UnknownCondition(_) => "LOGIC_UNKNOWN_CONDITION",
            Self::ConditionDepthExceeded { .. } => "LOGIC_CONDITION_DEPTH",
            Self::OperatorFailed { .. } => "LOGIC_OPERATOR_FAILED",
            Self::Store(_) => "LOGIC_STORE",
        }
    }
}
