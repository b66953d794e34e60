use crate::error::{ErrorSeverity, GameError};
use crate::state::{EntityId, StoreError};

/// Errors that end a discovery run for the actor.
///
/// Everything recoverable is turned into a per-action rejection before it
/// reaches this type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("actor has no id")]
    MissingActorId,

    #[error("actor '{0}' not found")]
    ActorNotFound(EntityId),

    #[error("entity store access failed: {0}")]
    Store(#[from] StoreError),
}

impl GameError for PipelineError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingActorId => "PIPELINE_MISSING_ACTOR_ID",
            Self::ActorNotFound(_) => "PIPELINE_ACTOR_NOT_FOUND",
            Self::Store(_) => "PIPELINE_STORE",
        }
    }
}
