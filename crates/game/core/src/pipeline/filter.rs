//! Component filtering stage.
use std::time::Instant;

use super::trace::{Tracer, timestamp_ms};
use super::{PipelineStage, Rejection, RejectionDetail, RejectionReason};
use crate::action::{ActionDefinition, RequirementSet};
use crate::state::EntitySnapshot;

/// Result of comparing an actor's components with one definition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentMatch {
    /// Required components the actor lacks, sorted.
    pub missing: Vec<String>,
    /// Forbidden components the actor has, sorted.
    pub forbidden: Vec<String>,
}

impl ComponentMatch {
    pub fn evaluate(actor_components: &RequirementSet, definition: &ActionDefinition) -> Self {
        Self {
            missing: definition.required_components().missing_from(actor_components),
            forbidden: definition
                .forbidden_components()
                .intersection(actor_components)
                .to_vec(),
        }
    }

    pub fn passed(&self) -> bool {
        self.missing.is_empty() && self.forbidden.is_empty()
    }

    /// Forbidden components take precedence over missing ones.
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        if !self.forbidden.is_empty() {
            Some(RejectionReason::ForbiddenComponentPresent)
        } else if !self.missing.is_empty() {
            Some(RejectionReason::MissingRequiredComponent)
        } else {
            None
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ComponentCapture<'a> {
    actor_id: &'a str,
    required_components: &'a RequirementSet,
    forbidden_components: &'a RequirementSet,
    actor_components: &'a RequirementSet,
    component_match_passed: bool,
    missing_components: &'a [String],
    forbidden_present: &'a [String],
    processing_time_ms: f64,
    timestamp: i64,
}

pub(crate) struct ComponentStage<'c> {
    pub passed: Vec<&'c ActionDefinition>,
    pub rejections: Vec<Rejection>,
}

/// Keeps the definitions whose actor requirements `actor` satisfies.
pub(crate) fn filter_components<'c>(
    actor: &EntitySnapshot,
    candidates: impl IntoIterator<Item = &'c ActionDefinition>,
    tracer: &Tracer<'_>,
) -> ComponentStage<'c> {
    let actor_components = actor.component_set();
    let mut stage = ComponentStage {
        passed: Vec::new(),
        rejections: Vec::new(),
    };

    for definition in candidates {
        let started = Instant::now();
        let matched = ComponentMatch::evaluate(&actor_components, definition);

        tracer.capture(PipelineStage::ComponentFiltering, definition.id(), || {
            ComponentCapture {
                actor_id: actor.id.as_str(),
                required_components: definition.required_components(),
                forbidden_components: definition.forbidden_components(),
                actor_components: &actor_components,
                component_match_passed: matched.passed(),
                missing_components: &matched.missing,
                forbidden_present: &matched.forbidden,
                processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                timestamp: timestamp_ms(),
            }
        });

        match matched.rejection_reason() {
            None => stage.passed.push(definition),
            Some(reason) => {
                tracing::trace!(action = definition.id(), %reason, "rejected by component filter");
                stage.rejections.push(Rejection {
                    action_id: definition.id().to_owned(),
                    stage: PipelineStage::ComponentFiltering,
                    reason,
                    detail: RejectionDetail::Components {
                        missing: matched.missing,
                        forbidden: matched.forbidden,
                    },
                });
            }
        }
    }
    stage
}
