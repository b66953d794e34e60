//! Entity store access errors.

use crate::error::{ErrorSeverity, GameError};
use crate::state::EntityId;

/// Errors raised by an entity store implementation.
///
/// An entity that simply does not exist is not an error; lookups return
/// `Ok(None)`. These variants describe a store that cannot answer at all.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store cannot be read.
    #[error("entity store unavailable: {0}")]
    Unavailable(String),

    /// An entity record exists but cannot be decoded.
    #[error("entity {entity} is corrupted: {reason}")]
    Corrupted { entity: EntityId, reason: String },
}

impl GameError for StoreError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "STORE_UNAVAILABLE",
            Self::Corrupted { .. } => "STORE_CORRUPTED",
        }
    }
}
