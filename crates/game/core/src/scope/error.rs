use crate::error::{ErrorSeverity, GameError};
use crate::logic::LogicError;
use crate::state::StoreError;

/// Errors raised while resolving a scope.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("unknown scope '{0}'")]
    UnknownScope(String),

    /// A context-anchored scope was resolved for a slot with no bound dependency.
    #[error("scope '{scope}' needs a context entity but none is bound")]
    MissingContext { scope: String },

    #[error("filter of scope '{scope}' failed")]
    Filter {
        scope: String,
        #[source]
        source: LogicError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScopeError {
    /// The store failure behind this error, including one raised by the filter.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            Self::Filter { source, .. } => source.store_error(),
            _ => None,
        }
    }
}

impl GameError for ScopeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownScope(_) | Self::MissingContext { .. } => ErrorSeverity::Validation,
            Self::Filter { source, .. } => source.severity(),
            Self::Store(_) => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownScope(_) => "SCOPE_UNKNOWN",
            Self::MissingContext { .. } => "SCOPE_MISSING_CONTEXT",
            Self::Filter { .. } => "SCOPE_FILTER_FAILED",
            Self::Store(_) => "SCOPE_STORE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failure_inside_a_filter_is_fatal() {
        let offline = StoreError::Unavailable("index offline".into());
        let err = ScopeError::Filter {
            scope: "core:keys".into(),
            source: LogicError::Store(offline.clone()),
        };
        assert_eq!(err.severity(), ErrorSeverity::Fatal);
        assert_eq!(err.store_error(), Some(&offline));

        let err = ScopeError::Filter {
            scope: "core:keys".into(),
            source: LogicError::UnknownCondition("core:missing".into()),
        };
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);
        assert_eq!(err.store_error(), None);
    }
}
