//! Action definitions and the catalog they are loaded into.
//!
//! - `requirements`: component requirement sets with set algebra
//! - `definition`: authored specs, target slots, prerequisite rules
//! - `catalog`: load-time validated collection of definitions
//! - `template`: command text rendering
mod catalog;
mod definition;
mod error;
mod requirements;
mod template;

pub use catalog::{ActionCatalog, CatalogBuild, RejectedDefinition};
pub use definition::{
    ActionDefinition, ActionSpec, PrerequisiteRule, SlotValidation, SlotViolation, TargetSlotSpec,
    ValueKind,
};
pub use error::DefinitionError;
pub use requirements::RequirementSet;
pub use template::render_command;
