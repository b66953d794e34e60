//! Multi-target resolution.
//!
//! Slots are resolved in the definition's resolution order. Root slots are
//! resolved once; a dependent slot is resolved once per partial binding set,
//! with the bound dependency as its context entity. Per-slot caps apply to
//! each candidate list before it is multiplied in. The product is walked
//! depth first in the same order a full expansion would list it, and the walk
//! stops as soon as the action cap is reached, so the first N combinations are
//! kept without building the rest.
use std::time::Instant;

use super::orchestrator::Deadline;
use super::trace::{Tracer, timestamp_ms};
use super::{Bindings, PipelineError, PipelineStage, Rejection, RejectionDetail, RejectionReason};
use crate::action::{ActionDefinition, SlotViolation, TargetSlotSpec};
use crate::logic::{EvaluationContext, Evaluator};
use crate::scope::{ScopeContext, ScopeError};
use crate::state::{EntityId, EntitySnapshot};

/// Slot bindings in resolution order.
#[derive(Clone, Debug, Default)]
pub(crate) struct BindingSet<'a> {
    slots: Vec<(&'a str, &'a EntitySnapshot)>,
}

impl<'a> BindingSet<'a> {
    pub fn get(&self, slot: &str) -> Option<&'a EntitySnapshot> {
        self.slots
            .iter()
            .find(|(name, _)| *name == slot)
            .map(|(_, entity)| *entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a EntitySnapshot)> + '_ {
        self.slots.iter().copied()
    }

    fn with(&self, slot: &'a str, entity: &'a EntitySnapshot) -> Self {
        let mut next = self.clone();
        next.slots.push((slot, entity));
        next
    }

    pub fn to_bindings(&self) -> Bindings {
        self.slots
            .iter()
            .map(|(slot, entity)| ((*slot).to_owned(), entity.id.clone()))
            .collect()
    }
}

pub(crate) enum TargetOutcome<'a> {
    Resolved(Vec<BindingSet<'a>>),
    Rejected(Rejection),
    Expired,
}

/// Why the walk over the product stopped early.
enum Halt<'a> {
    Fatal(PipelineError),
    Scope(&'a TargetSlotSpec, ScopeError),
    Expired,
}

impl From<PipelineError> for Halt<'_> {
    fn from(err: PipelineError) -> Self {
        Self::Fatal(err)
    }
}

/// Depth-first walk state for one definition.
struct Search<'a> {
    slots: Vec<&'a TargetSlotSpec>,
    roots: Vec<Option<Vec<&'a EntitySnapshot>>>,
    found: Vec<BindingSet<'a>>,
    cap: usize,
    /// Deepest slot index any partial binding reached.
    deepest: usize,
}

#[derive(serde::Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
enum CandidateRejection {
    NotFound,
    SelfTarget,
    Invalid { violation: SlotViolation },
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateReport {
    entity: EntityId,
    #[serde(flatten)]
    rejection: CandidateRejection,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotReport<'a> {
    slot: &'a str,
    scope: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a EntityId>,
    accepted: Vec<&'a EntityId>,
    rejected: Vec<CandidateReport>,
    truncated: usize,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetCapture<'a> {
    actor_id: &'a str,
    slots: &'a [SlotReport<'a>],
    combinations: usize,
    max_combinations: usize,
    capped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_slot: Option<&'a str>,
    processing_time_ms: f64,
    timestamp: i64,
}

/// Per-action resolution run state.
struct Resolution<'a> {
    definition: &'a ActionDefinition,
    started: Instant,
    traced: bool,
    reports: Vec<SlotReport<'a>>,
}

pub(crate) struct TargetResolver<'a> {
    evaluator: Evaluator<'a>,
    actor: &'a EntitySnapshot,
    tracer: Tracer<'a>,
    default_max_combinations: usize,
}

impl<'a> TargetResolver<'a> {
    pub fn new(
        evaluator: Evaluator<'a>,
        actor: &'a EntitySnapshot,
        tracer: Tracer<'a>,
        default_max_combinations: usize,
    ) -> Self {
        Self {
            evaluator,
            actor,
            tracer,
            default_max_combinations,
        }
    }

    /// Produces the ordered binding sets for `definition`.
    ///
    /// `Err` is reserved for store failures; everything else becomes a
    /// rejection of this one action.
    pub fn resolve(
        &self,
        definition: &'a ActionDefinition,
        deadline: &Deadline,
    ) -> Result<TargetOutcome<'a>, PipelineError> {
        let mut run = Resolution {
            definition,
            started: Instant::now(),
            traced: self.tracer.is_traced(definition.id()),
            reports: Vec::new(),
        };
        let slots: Vec<_> = definition.resolution_order().collect();
        let mut search = Search {
            roots: vec![None; slots.len()],
            slots,
            found: Vec::new(),
            cap: definition
                .max_combinations()
                .unwrap_or(self.default_max_combinations),
            deepest: 0,
        };

        if search.cap > 0 {
            match self.extend(&mut run, &mut search, BindingSet::default(), 0, deadline) {
                Ok(()) => {}
                Err(Halt::Fatal(err)) => return Err(err),
                Err(Halt::Scope(slot, err)) => return Ok(self.scope_failed(&run, slot, err)),
                Err(Halt::Expired) => return Ok(TargetOutcome::Expired),
            }

            if search.found.is_empty()
                && let Some(slot) = search.slots.get(search.deepest)
            {
                tracing::trace!(action = definition.id(), slot = %slot.name, "required slot has no candidates");
                self.capture(&run, 0, search.cap, Some(&slot.name));
                return Ok(TargetOutcome::Rejected(Rejection {
                    action_id: definition.id().to_owned(),
                    stage: PipelineStage::TargetResolution,
                    reason: RejectionReason::RequiredSlotEmpty,
                    detail: RejectionDetail::Slot {
                        slot: slot.name.clone(),
                        scope: slot.scope.clone(),
                    },
                }));
            }
        }

        self.capture(&run, search.found.len(), search.cap, None);
        Ok(TargetOutcome::Resolved(search.found))
    }

    /// Binds the slot at `depth` for `partial` and recurses into the next one.
    fn extend(
        &self,
        run: &mut Resolution<'a>,
        search: &mut Search<'a>,
        partial: BindingSet<'a>,
        depth: usize,
        deadline: &Deadline,
    ) -> Result<(), Halt<'a>> {
        if deadline.expired() {
            return Err(Halt::Expired);
        }
        search.deepest = search.deepest.max(depth);
        let Some(&slot) = search.slots.get(depth) else {
            search.found.push(partial);
            return Ok(());
        };

        let candidates = match slot.depends_on.as_deref() {
            None => match search.roots[depth].clone() {
                Some(candidates) => candidates,
                None => {
                    let candidates = self.slot_candidates(run, slot, None, &BindingSet::default())?;
                    search.roots[depth] = Some(candidates.clone());
                    candidates
                }
            },
            Some(dependency) => match partial.get(dependency) {
                Some(context) => self.slot_candidates(run, slot, Some(context), &partial)?,
                // The dependency was an omitted optional slot.
                None => Vec::new(),
            },
        };

        if candidates.is_empty() {
            if !slot.required && run.definition.allow_optional_slots() {
                return self.extend(run, search, partial, depth + 1, deadline);
            }
            return Ok(());
        }
        for candidate in candidates {
            if search.found.len() >= search.cap {
                break;
            }
            self.extend(run, search, partial.with(&slot.name, candidate), depth + 1, deadline)?;
        }
        Ok(())
    }

    fn slot_candidates(
        &self,
        run: &mut Resolution<'a>,
        slot: &'a TargetSlotSpec,
        context: Option<&'a EntitySnapshot>,
        partial: &BindingSet<'a>,
    ) -> Result<Vec<&'a EntitySnapshot>, Halt<'a>> {
        self.candidates(run, slot, context, partial)?
            .map_err(|err| Halt::Scope(slot, err))
    }

    /// Valid candidates for `slot`, capped at the slot limit.
    ///
    /// The outer `Result` carries store errors, including one raised by a
    /// scope filter; the inner one carries scope failures that only reject
    /// this action.
    fn candidates(
        &self,
        run: &mut Resolution<'a>,
        slot: &'a TargetSlotSpec,
        context: Option<&'a EntitySnapshot>,
        partial: &BindingSet<'a>,
    ) -> Result<Result<Vec<&'a EntitySnapshot>, ScopeError>, PipelineError> {
        let base = partial.iter().fold(
            EvaluationContext::new(self.actor, self.evaluator.env().world()).with_target(context),
            |ctx, (name, entity)| ctx.with_slot(name, entity),
        );
        let env = self.evaluator.env();
        let ids = match env
            .scopes()
            .resolve_scope(&slot.scope, &ScopeContext::new(self.evaluator, base))
        {
            Ok(ids) => ids,
            Err(err) => match err.store_error() {
                Some(store) => return Err(store.clone().into()),
                None => return Ok(Err(err)),
            },
        };

        let limit = slot.max_combinations.unwrap_or(usize::MAX);
        let mut report = SlotReport {
            slot: &slot.name,
            scope: &slot.scope,
            context: context.map(|entity| &entity.id),
            accepted: Vec::new(),
            rejected: Vec::new(),
            truncated: 0,
        };
        let mut accepted = Vec::new();

        for id in ids {
            let rejection = match env.entities().entity(&id)? {
                None => Some(CandidateRejection::NotFound),
                Some(entity) if !slot.allow_self && entity.id == self.actor.id => {
                    Some(CandidateRejection::SelfTarget)
                }
                Some(entity) => match slot.validation.check(entity) {
                    Err(violation) => Some(CandidateRejection::Invalid { violation }),
                    Ok(()) if accepted.len() >= limit => {
                        report.truncated += 1;
                        None
                    }
                    Ok(()) => {
                        accepted.push(entity);
                        if run.traced {
                            report.accepted.push(&entity.id);
                        }
                        None
                    }
                },
            };
            if let Some(rejection) = rejection
                && run.traced
            {
                report.rejected.push(CandidateReport {
                    entity: id,
                    rejection,
                });
            }
        }

        if run.traced {
            run.reports.push(report);
        }
        Ok(Ok(accepted))
    }

    fn scope_failed(&self, run: &Resolution<'a>, slot: &TargetSlotSpec, err: ScopeError) -> TargetOutcome<'a> {
        let definition = run.definition;
        tracing::trace!(action = definition.id(), slot = %slot.name, error = %err, "scope resolution failed");
        self.capture(run, 0, 0, Some(&slot.name));
        TargetOutcome::Rejected(Rejection {
            action_id: definition.id().to_owned(),
            stage: PipelineStage::TargetResolution,
            reason: RejectionReason::ScopeResolutionFailed,
            detail: RejectionDetail::Scope {
                slot: slot.name.clone(),
                scope: slot.scope.clone(),
                error: error_chain(&err),
            },
        })
    }

    fn capture(&self, run: &Resolution<'a>, combinations: usize, cap: usize, failed_slot: Option<&str>) {
        if !run.traced {
            return;
        }
        self.tracer
            .capture(PipelineStage::TargetResolution, run.definition.id(), || TargetCapture {
                actor_id: self.actor.id.as_str(),
                slots: &run.reports,
                combinations,
                max_combinations: cap,
                capped: cap > 0 && combinations >= cap,
                failed_slot,
                processing_time_ms: run.started.elapsed().as_secs_f64() * 1000.0,
                timestamp: timestamp_ms(),
            });
    }
}

/// Renders an error with its sources, outermost first.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// The first bound slot in declaration order, exposed to rules as `target`.
pub(crate) fn primary_target<'a>(
    definition: &ActionDefinition,
    set: &BindingSet<'a>,
) -> Option<&'a EntitySnapshot> {
    definition
        .targets()
        .iter()
        .find_map(|slot| set.get(&slot.name))
}
