//! Pipeline output types.
use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use crate::logic::Explanation;
use crate::state::EntityId;

/// The three evaluation stages, in execution order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[derive(strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStage {
    ComponentFiltering,
    TargetResolution,
    PrerequisiteEvaluation,
}

/// Slot name to bound entity id. Omitted optional slots are absent.
pub type Bindings = BTreeMap<String, EntityId>;

/// An executable action with one concrete set of bindings.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiscoveredAction {
    pub action_id: String,
    pub name: String,
    /// Display text rendered from the definition's template.
    pub command: String,
    pub bindings: Bindings,
}

/// Why an action was excluded from the result.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectionReason {
    MissingRequiredComponent,
    ForbiddenComponentPresent,
    /// A rule or predicate raised an error instead of returning a value.
    EvaluationError,
    RequiredSlotEmpty,
    ScopeResolutionFailed,
    PrerequisiteFailed,
}

/// The first failing prerequisite for one binding set.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PrerequisiteFailure {
    pub rule_index: usize,
    /// The rule exactly as authored.
    pub logic: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    pub bindings: Bindings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
    /// Set when the rule raised an error rather than evaluating to false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Structured detail attached to a [`Rejection`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionDetail {
    Components {
        missing: Vec<String>,
        forbidden: Vec<String>,
    },
    Slot {
        slot: String,
        scope: String,
    },
    Scope {
        slot: String,
        scope: String,
        error: String,
    },
    Prerequisite(PrerequisiteFailure),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Rejection {
    pub action_id: String,
    pub stage: PipelineStage,
    pub reason: RejectionReason,
    pub detail: RejectionDetail,
}

impl Rejection {
    /// Missing required components, empty unless rejected for them.
    pub fn missing_components(&self) -> &[String] {
        match &self.detail {
            RejectionDetail::Components { missing, .. } => missing,
            _ => &[],
        }
    }

    /// The failing rule, for prerequisite and evaluation error rejections.
    pub fn prerequisite_failure(&self) -> Option<&PrerequisiteFailure> {
        match &self.detail {
            RejectionDetail::Prerequisite(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Counts and timing for one stage.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StageDiagnostics {
    pub stage: PipelineStage,
    pub input: usize,
    pub output: usize,
    #[serde(with = "duration_micros")]
    pub elapsed: Duration,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineStatus {
    Completed,
    /// A fatal error ended the run; no actions are reported.
    Failed { error: String },
    /// The evaluation budget ran out; no actions are reported.
    TimedOut,
}

/// Outcome of one discovery run for one actor.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PipelineResult {
    pub actor_id: EntityId,
    pub status: PipelineStatus,
    pub actions: Vec<DiscoveredAction>,
    pub rejections: Vec<Rejection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<StageDiagnostics>,
}

impl PipelineResult {
    /// An empty completed result for `actor_id`.
    pub fn completed(actor_id: EntityId) -> Self {
        Self {
            actor_id,
            status: PipelineStatus::Completed,
            actions: Vec::new(),
            rejections: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// A failed result carrying the rendered error.
    pub fn failed(actor_id: EntityId, error: impl ToString) -> Self {
        Self {
            status: PipelineStatus::Failed {
                error: error.to_string(),
            },
            ..Self::completed(actor_id)
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PipelineStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, PipelineStatus::Failed { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        self.status == PipelineStatus::TimedOut
    }

    /// All discovered binding sets of one action, in result order.
    pub fn actions_for<'r>(&'r self, action_id: &'r str) -> impl Iterator<Item = &'r DiscoveredAction> {
        self.actions
            .iter()
            .filter(move |action| action.action_id == action_id)
    }

    /// The rejection recorded for `action_id`, if any.
    pub fn rejection(&self, action_id: &str) -> Option<&Rejection> {
        self.rejections
            .iter()
            .find(|rejection| rejection.action_id == action_id)
    }

    /// Timings for `stage`; empty unless diagnostics were collected.
    pub fn diagnostics_for(&self, stage: PipelineStage) -> Option<&StageDiagnostics> {
        self.diagnostics.iter().find(|entry| entry.stage == stage)
    }
}

mod duration_micros {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_micros()).unwrap_or(u64::MAX))
    }
}
