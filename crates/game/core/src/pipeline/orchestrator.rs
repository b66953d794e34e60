//! Stage sequencing for one actor.
use std::time::{Duration, Instant};

use super::filter::filter_components;
use super::prerequisites::{PrerequisiteOutcome, evaluate_action};
use super::targets::{TargetOutcome, TargetResolver};
use super::trace::{PipelineTrace, Tracer};
use super::{PipelineError, PipelineResult, PipelineStage, PipelineStatus, StageDiagnostics};
use crate::action::ActionCatalog;
use crate::config::PipelineConfig;
use crate::env::Env;
use crate::error::GameError;
use crate::logic::Evaluator;
use crate::state::{EntityId, EntitySnapshot};

/// Wall-clock budget for one run, checked between definitions and inside
/// each stage's per-binding loops.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Deadline {
    expires: Option<Instant>,
}

impl Deadline {
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            expires: budget.and_then(|budget| Instant::now().checked_add(budget)),
        }
    }

    pub fn expired(&self) -> bool {
        self.expires.is_some_and(|expires| Instant::now() >= expires)
    }
}

/// Collects per-stage counts and timings when enabled.
struct StageClock {
    enabled: bool,
    entries: Vec<StageDiagnostics>,
}

impl StageClock {
    fn record(&mut self, stage: PipelineStage, input: usize, output: usize, started: Instant) {
        tracing::debug!(%stage, input, output, "stage complete");
        if self.enabled {
            self.entries.push(StageDiagnostics {
                stage,
                input,
                output,
                elapsed: started.elapsed(),
            });
        }
    }
}

/// Discovers the executable actions of an actor.
///
/// Stages run in order over the whole candidate list: component filtering,
/// target resolution, prerequisite evaluation. Every recoverable problem
/// becomes a per-action [`Rejection`](super::Rejection); fatal errors and an
/// exhausted budget end the run with a non-completed
/// [`PipelineStatus`].
#[derive(Clone, Debug)]
pub struct ActionDiscovery<'a> {
    env: Env<'a>,
    config: PipelineConfig,
}

impl<'a> ActionDiscovery<'a> {
    pub fn new(env: Env<'a>, config: PipelineConfig) -> Self {
        Self { env, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline for `actor`. Never panics on bad data and never
    /// returns an error; failures are reported through the result status.
    pub fn discover(
        &self,
        actor: &EntitySnapshot,
        catalog: &ActionCatalog,
        trace: Option<&dyn PipelineTrace>,
    ) -> PipelineResult {
        self.run(actor, catalog, trace)
            .unwrap_or_else(|err| self.fail(actor.id.clone(), err))
    }

    /// Looks the actor up in the entity store, then runs [`Self::discover`].
    pub fn discover_by_id(
        &self,
        actor_id: &EntityId,
        catalog: &ActionCatalog,
        trace: Option<&dyn PipelineTrace>,
    ) -> PipelineResult {
        match self.env.entities().entity(actor_id) {
            Ok(Some(actor)) => self.discover(actor, catalog, trace),
            Ok(None) => self.fail(actor_id.clone(), PipelineError::ActorNotFound(actor_id.clone())),
            Err(err) => self.fail(actor_id.clone(), err.into()),
        }
    }

    fn fail(&self, actor_id: EntityId, err: PipelineError) -> PipelineResult {
        tracing::error!(actor = %actor_id, code = err.error_code(), "action discovery failed: {err}");
        PipelineResult::failed(actor_id, err)
    }

    fn run<'r>(
        &self,
        actor: &'r EntitySnapshot,
        catalog: &'r ActionCatalog,
        trace: Option<&'r dyn PipelineTrace>,
    ) -> Result<PipelineResult, PipelineError>
    where
        'a: 'r,
    {
        if actor.id.is_empty() {
            return Err(PipelineError::MissingActorId);
        }

        let env: Env<'r> = self.env;
        let evaluator = Evaluator::new(env).with_max_depth(self.config.max_condition_depth);
        let tracer = Tracer::new(trace);
        let deadline = Deadline::new(self.config.budget());
        let mut clock = StageClock {
            enabled: self.config.collect_diagnostics || tracer.is_enabled(),
            entries: Vec::new(),
        };
        let mut result = PipelineResult::completed(actor.id.clone());

        let started = Instant::now();
        let filtered = filter_components(actor, catalog, &tracer);
        result.rejections.extend(filtered.rejections);
        clock.record(PipelineStage::ComponentFiltering, catalog.len(), filtered.passed.len(), started);
        tracer.stage_completed(PipelineStage::ComponentFiltering, filtered.passed.len());

        let started = Instant::now();
        let resolver = TargetResolver::new(evaluator, actor, tracer, self.config.default_max_combinations);
        let mut resolved = Vec::with_capacity(filtered.passed.len());
        for &definition in &filtered.passed {
            if deadline.expired() {
                return Ok(self.timed_out(result, clock, PipelineStage::TargetResolution));
            }
            match resolver.resolve(definition, &deadline)? {
                TargetOutcome::Resolved(sets) => resolved.push((definition, sets)),
                TargetOutcome::Rejected(rejection) => result.rejections.push(rejection),
                TargetOutcome::Expired => {
                    return Ok(self.timed_out(result, clock, PipelineStage::TargetResolution));
                }
            }
        }
        clock.record(PipelineStage::TargetResolution, filtered.passed.len(), resolved.len(), started);
        tracer.stage_completed(PipelineStage::TargetResolution, resolved.len());

        let started = Instant::now();
        let mut passed = 0;
        for (definition, sets) in &resolved {
            if deadline.expired() {
                return Ok(self.timed_out(result, clock, PipelineStage::PrerequisiteEvaluation));
            }
            match evaluate_action(&evaluator, actor, definition, sets, &tracer, &deadline)? {
                PrerequisiteOutcome::Passed(actions) => {
                    passed += 1;
                    result.actions.extend(actions);
                }
                PrerequisiteOutcome::Rejected(rejection) => result.rejections.push(rejection),
                PrerequisiteOutcome::Expired => {
                    return Ok(self.timed_out(result, clock, PipelineStage::PrerequisiteEvaluation));
                }
            }
        }
        clock.record(PipelineStage::PrerequisiteEvaluation, resolved.len(), passed, started);
        tracer.stage_completed(PipelineStage::PrerequisiteEvaluation, passed);

        tracing::debug!(
            actor = %actor.id,
            actions = result.actions.len(),
            rejected = result.rejections.len(),
            "action discovery complete"
        );
        result.diagnostics = clock.entries;
        Ok(result)
    }

    fn timed_out(&self, mut result: PipelineResult, clock: StageClock, stage: PipelineStage) -> PipelineResult {
        tracing::warn!(
            actor = %result.actor_id,
            %stage,
            budget_ms = ?self.config.evaluation_budget_ms,
            "evaluation budget exceeded"
        );
        result.status = PipelineStatus::TimedOut;
        result.actions.clear();
        result.diagnostics = clock.entries;
        result
    }
}
