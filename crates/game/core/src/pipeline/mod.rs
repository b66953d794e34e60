//! The action discovery pipeline.
//!
//! [`ActionDiscovery`] runs three stages over an [`ActionCatalog`] for one
//! actor:
//!
//! 1. component filtering against the actor's component set
//! 2. target resolution of every slot, dependencies first
//! 3. prerequisite evaluation for each binding set
//!
//! The pipeline only reads entity state. Every action in a completed result
//! satisfied all of its required components, none of its forbidden ones and
//! all of its prerequisite rules for the reported bindings.
//!
//! [`ActionCatalog`]: crate::action::ActionCatalog
mod error;
mod filter;
mod orchestrator;
mod prerequisites;
mod result;
mod targets;
mod trace;

pub use error::PipelineError;
pub use filter::ComponentMatch;
pub use orchestrator::ActionDiscovery;
pub use prerequisites::check_prerequisites;
pub use result::{
    Bindings, DiscoveredAction, PipelineResult, PipelineStage, PipelineStatus, PrerequisiteFailure,
    Rejection, RejectionDetail, RejectionReason, StageDiagnostics,
};
pub use trace::{
    ActionDataCapture, ActionTrace, CapturedAction, PipelineTrace, TraceError, TraceFilter,
};
