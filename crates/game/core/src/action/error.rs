//! Load-time definition errors.
use crate::error::{ErrorSeverity, GameError};
use crate::logic::LogicError;

/// Reasons an action definition is rejected while building the catalog.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("action definition has an empty id")]
    EmptyId,

    /// The same component is both required and forbidden for the actor.
    #[error("action '{action}' both requires and forbids {components:?}")]
    ComponentConflict {
        action: String,
        components: Vec<String>,
    },

    #[error("slot '{slot}' of action '{action}' both requires and forbids {components:?}")]
    SlotComponentConflict {
        action: String,
        slot: String,
        components: Vec<String>,
    },

    #[error("action '{action}' has a target slot with an empty name")]
    EmptySlotName { action: String },

    #[error("action '{action}' declares slot '{slot}' more than once")]
    DuplicateSlot { action: String, slot: String },

    #[error("slot '{slot}' of action '{action}' has no scope")]
    EmptyScope { action: String, slot: String },

    #[error("slot '{slot}' of action '{action}' depends on unknown slot '{depends_on}'")]
    UnknownDependency {
        action: String,
        slot: String,
        depends_on: String,
    },

    /// Slots form a dependency cycle; `cycle` lists the slots in walk order.
    #[error("action '{action}' has a slot dependency cycle: {}", .cycle.join(" -> "))]
    DependencyCycle { action: String, cycle: Vec<String> },

    /// A combination cap of zero would make the action undiscoverable.
    #[error("action '{action}' declares a zero combination limit{}", .slot.as_deref().map(|s| format!(" on slot '{s}'")).unwrap_or_default())]
    ZeroCombinationLimit { action: String, slot: Option<String> },

    #[error("prerequisite {index} of action '{action}' is invalid")]
    InvalidLogic {
        action: String,
        index: usize,
        #[source]
        source: LogicError,
    },

    #[error("action '{0}' is defined more than once")]
    DuplicateAction(String),
}

impl GameError for DefinitionError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyId => "DEFINITION_EMPTY_ID",
            Self::ComponentConflict { .. } => "DEFINITION_COMPONENT_CONFLICT",
            Self::SlotComponentConflict { .. } => "DEFINITION_SLOT_COMPONENT_CONFLICT",
            Self::EmptySlotName { .. } => "DEFINITION_EMPTY_SLOT_NAME",
            Self::DuplicateSlot { .. } => "DEFINITION_DUPLICATE_SLOT",
            Self::EmptyScope { .. } => "DEFINITION_EMPTY_SCOPE",
            Self::UnknownDependency { .. } => "DEFINITION_UNKNOWN_DEPENDENCY",
            Self::DependencyCycle { .. } => "DEFINITION_DEPENDENCY_CYCLE",
            Self::ZeroCombinationLimit { .. } => "DEFINITION_ZERO_COMBINATION_LIMIT",
            Self::InvalidLogic { .. } => "DEFINITION_INVALID_LOGIC",
            Self::DuplicateAction(_) => "DEFINITION_DUPLICATE_ACTION",
        }
    }
}
