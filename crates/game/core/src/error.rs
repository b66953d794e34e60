//! Shared error classification.
//!
//! Each concern defines its own `thiserror` enum next to the code that raises
//! it ([`crate::StoreError`], [`crate::LogicError`], [`crate::ScopeError`],
//! [`crate::DefinitionError`], [`crate::TraceError`], [`crate::PipelineError`]).
//! All of them implement [`GameError`] so callers can route failures without
//! matching on every variant.
//!
//! Where each severity ends up:
//!
//! | Severity      | Raised by                                | Effect                         |
//! |---------------|------------------------------------------|--------------------------------|
//! | `Recoverable` | an operator or scope filter, a trace sink | one action rejected, or ignored |
//! | `Validation`  | definitions, unknown scope ids           | definition or action rejected  |
//! | `Internal`    | broken invariants                        | logged, treated as fatal       |
//! | `Fatal`       | missing actor, entity store failure      | run ends with `failed` status  |

/// How far an error propagates.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[derive(strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

/// Classification implemented by every error in this crate.
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Stable, upper snake case identifier of the variant (`SCOPE_UNKNOWN`).
    fn error_code(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_order_by_reach() {
        assert!(ErrorSeverity::Recoverable < ErrorSeverity::Fatal);
        assert!(ErrorSeverity::Validation < ErrorSeverity::Internal);
        assert_eq!(ErrorSeverity::Fatal.to_string(), "fatal");
    }
}
