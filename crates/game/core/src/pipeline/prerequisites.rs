//! Prerequisite evaluation.
use std::time::Instant;

use super::orchestrator::Deadline;
use super::targets::{BindingSet, error_chain, primary_target};
use super::trace::{Tracer, timestamp_ms};
use super::{
    Bindings, DiscoveredAction, PipelineError, PipelineStage, PrerequisiteFailure, Rejection,
    RejectionDetail, RejectionReason,
};
use crate::action::{ActionDefinition, PrerequisiteRule, render_command};
use crate::logic::{EvaluationContext, Evaluator};
use crate::state::EntitySnapshot;

/// Evaluates `rules` in order and stops at the first one that does not pass.
///
/// A rule that raises an error counts as failed; the error text is kept in
/// [`PrerequisiteFailure::error`]. `bindings` is only called on failure.
///
/// The outer `Result` carries entity store failures, which end the run; the
/// inner one is the verdict for this binding.
pub fn check_prerequisites(
    evaluator: &Evaluator<'_>,
    rules: &[PrerequisiteRule],
    ctx: &EvaluationContext<'_>,
    bindings: impl FnOnce() -> Bindings,
) -> Result<Result<(), PrerequisiteFailure>, PipelineError> {
    for (rule_index, rule) in rules.iter().enumerate() {
        let (explanation, error) = match evaluator.test(&rule.logic, ctx) {
            Ok(true) => continue,
            Ok(false) => (Some(evaluator.explain(&rule.logic, ctx)), None),
            Err(err) => match err.store_error() {
                Some(store) => return Err(store.clone().into()),
                None => (None, Some(error_chain(&err))),
            },
        };
        return Ok(Err(PrerequisiteFailure {
            rule_index,
            logic: rule.logic.source().clone(),
            failure_message: rule.failure_message.clone(),
            bindings: bindings(),
            explanation,
            error,
        }));
    }
    Ok(Ok(()))
}

pub(crate) enum PrerequisiteOutcome {
    Passed(Vec<DiscoveredAction>),
    Rejected(Rejection),
    Expired,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct PrerequisiteCapture<'a> {
    actor_id: &'a str,
    rule_count: usize,
    combinations: usize,
    passed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_failure: Option<&'a PrerequisiteFailure>,
    processing_time_ms: f64,
    timestamp: i64,
}

/// Keeps the binding sets of `definition` that satisfy every rule.
///
/// The action is rejected with the first failure only when no binding set
/// passes.
pub(crate) fn evaluate_action<'a>(
    evaluator: &Evaluator<'a>,
    actor: &'a EntitySnapshot,
    definition: &'a ActionDefinition,
    sets: &[BindingSet<'a>],
    tracer: &Tracer<'_>,
    deadline: &Deadline,
) -> Result<PrerequisiteOutcome, PipelineError> {
    let started = Instant::now();
    let world = evaluator.env().world();
    let mut actions = Vec::with_capacity(sets.len());
    let mut first_failure = None;

    for set in sets {
        if deadline.expired() {
            return Ok(PrerequisiteOutcome::Expired);
        }
        let ctx = set.iter().fold(
            EvaluationContext::new(actor, world).with_target(primary_target(definition, set)),
            |ctx, (slot, entity)| ctx.with_slot(slot, entity),
        );
        match check_prerequisites(evaluator, definition.prerequisites(), &ctx, || set.to_bindings())? {
            Ok(()) => actions.push(discovered(actor, definition, set)),
            Err(failure) => {
                tracing::trace!(
                    action = definition.id(),
                    rule = failure.rule_index,
                    "prerequisite failed"
                );
                first_failure.get_or_insert(failure);
            }
        }
    }

    tracer.capture(PipelineStage::PrerequisiteEvaluation, definition.id(), || PrerequisiteCapture {
        actor_id: actor.id.as_str(),
        rule_count: definition.prerequisites().len(),
        combinations: sets.len(),
        passed: actions.len(),
        first_failure: first_failure.as_ref(),
        processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        timestamp: timestamp_ms(),
    });

    Ok(match first_failure {
        Some(failure) if actions.is_empty() => {
            let reason = if failure.error.is_some() {
                RejectionReason::EvaluationError
            } else {
                RejectionReason::PrerequisiteFailed
            };
            PrerequisiteOutcome::Rejected(Rejection {
                action_id: definition.id().to_owned(),
                stage: PipelineStage::PrerequisiteEvaluation,
                reason,
                detail: RejectionDetail::Prerequisite(failure),
            })
        }
        _ => PrerequisiteOutcome::Passed(actions),
    })
}

fn discovered(actor: &EntitySnapshot, definition: &ActionDefinition, set: &BindingSet<'_>) -> DiscoveredAction {
    let command = match definition.template() {
        Some(template) => render_command(template, |key| match key {
            "actor" => Some(actor.display_name()),
            slot => set.get(slot).map(EntitySnapshot::display_name),
        }),
        None => definition.name().to_owned(),
    };
    DiscoveredAction {
        action_id: definition.id().to_owned(),
        name: definition.name().to_owned(),
        command,
        bindings: set.to_bindings(),
    }
}
