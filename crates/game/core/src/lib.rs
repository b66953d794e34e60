//! Deterministic action discovery shared by the runtime and offline tools.
//!
//! `game-core` decides which actions an entity can take right now and with
//! which targets. It reads entity snapshots through the oracles in [`env`],
//! evaluates data-driven rules from [`logic`] and [`scope`], and runs the
//! staged [`pipeline::ActionDiscovery`]. Nothing here mutates entity state
//! or performs I/O.
pub mod action;
pub mod config;
pub mod env;
pub mod error;
pub mod logic;
pub mod pipeline;
pub mod scope;
pub mod state;

pub use action::{
    ActionCatalog, ActionDefinition, ActionSpec, CatalogBuild, DefinitionError, PrerequisiteRule,
    RejectedDefinition, RequirementSet, SlotValidation, TargetSlotSpec, ValueKind,
};
pub use config::PipelineConfig;
pub use env::{ConditionOracle, EntityOracle, Env, ScopeOracle};
pub use error::{ErrorSeverity, GameError};
pub use logic::{
    ConditionRegistry, CustomOperator, EvaluationContext, Evaluator, Explanation, Logic,
    LogicError, OperatorRegistry,
};
pub use pipeline::{
    ActionDataCapture, ActionDiscovery, ActionTrace, DiscoveredAction, PipelineError,
    PipelineResult, PipelineStage, PipelineStatus, PipelineTrace, Rejection, RejectionReason,
    TraceError, TraceFilter,
};
pub use scope::{ScopeAnchor, ScopeContext, ScopeDefinition, ScopeError, ScopeRegistry, ScopeSource};
pub use state::{EntityId, EntitySnapshot, EntityStore, StoreError, WorldContext};
