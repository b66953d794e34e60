//! Optional tracing capability.
//!
//! A caller may hand the pipeline any [`PipelineTrace`]. Per-action payloads
//! are only produced when the trace also exposes an [`ActionDataCapture`]
//! through [`PipelineTrace::action_capture`] and that capture marks the action
//! id as traced. Capture failures are logged at `debug` and otherwise ignored:
//! tracing never changes a [`PipelineResult`](super::PipelineResult).
use std::sync::Mutex;

use serde_json::Value;

use super::PipelineStage;
use crate::error::{ErrorSeverity, GameError};

/// Errors a capture sink may report.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    #[error("trace sink is full")]
    Full,

    #[error("trace sink is closed")]
    Closed,

    #[error("trace payload could not be encoded: {0}")]
    Payload(String),

    #[error("trace sink failed: {0}")]
    Sink(String),
}

impl GameError for TraceError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Full => "TRACE_FULL",
            Self::Closed => "TRACE_CLOSED",
            Self::Payload(_) => "TRACE_PAYLOAD",
            Self::Sink(_) => "TRACE_SINK",
        }
    }
}

/// Receives per-stage data for selected actions.
pub trait ActionDataCapture: Send + Sync {
    /// Whether payloads should be built for `action_id` at all.
    fn is_action_traced(&self, action_id: &str) -> bool;

    fn capture_action_data(
        &self,
        stage: PipelineStage,
        action_id: &str,
        payload: Value,
    ) -> Result<(), TraceError>;
}

/// A trace context supplied by the caller.
pub trait PipelineTrace: Send + Sync {
    /// The per-action capture capability, if this trace provides one.
    fn action_capture(&self) -> Option<&dyn ActionDataCapture> {
        None
    }

    /// Called once per stage with the number of actions that survived it.
    fn stage_completed(&self, _stage: PipelineStage, _remaining: usize) {}
}

/// Selects traced actions by id.
///
/// A pattern is an exact id, `*` for everything, or a prefix ending in `*`
/// such as `core:*`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TraceFilter {
    patterns: Vec<String>,
}

impl TraceFilter {
    pub fn new<S: Into<String>>(patterns: impl IntoIterator<Item = S>) -> Self {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// A filter that traces every action.
    pub fn all() -> Self {
        Self::new(["*"])
    }

    /// Whether `action_id` is selected by any pattern.
    pub fn matches(&self, action_id: &str) -> bool {
        self.patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => action_id.starts_with(prefix),
            None => pattern == action_id,
        })
    }
}

/// One recorded payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CapturedAction {
    pub stage: PipelineStage,
    pub action_id: String,
    pub payload: Value,
}

/// In-memory trace that records payloads for filtered actions.
#[derive(Debug, Default)]
pub struct ActionTrace {
    filter: TraceFilter,
    captures: Mutex<Vec<CapturedAction>>,
}

impl ActionTrace {
    pub fn new(filter: TraceFilter) -> Self {
        Self {
            filter,
            captures: Mutex::new(Vec::new()),
        }
    }

    /// Everything captured so far, in capture order.
    pub fn captures(&self) -> Vec<CapturedAction> {
        self.captures
            .lock()
            .map(|captures| captures.clone())
            .unwrap_or_default()
    }

    /// The first payload captured for `action_id` at `stage`.
    pub fn payload(&self, stage: PipelineStage, action_id: &str) -> Option<Value> {
        self.captures()
            .into_iter()
            .find(|capture| capture.stage == stage && capture.action_id == action_id)
            .map(|capture| capture.payload)
    }
}

impl ActionDataCapture for ActionTrace {
    fn is_action_traced(&self, action_id: &str) -> bool {
        self.filter.matches(action_id)
    }

    fn capture_action_data(
        &self,
        stage: PipelineStage,
        action_id: &str,
        payload: Value,
    ) -> Result<(), TraceError> {
        let mut captures = self
            .captures
            .lock()
            .map_err(|_| TraceError::Sink("capture buffer poisoned".into()))?;
        captures.push(CapturedAction {
            stage,
            action_id: action_id.to_owned(),
            payload,
        });
        Ok(())
    }
}

impl PipelineTrace for ActionTrace {
    fn action_capture(&self) -> Option<&dyn ActionDataCapture> {
        Some(self)
    }
}

/// Pipeline-side view of the caller's trace.
#[derive(Clone, Copy, Default)]
pub(crate) struct Tracer<'t> {
    trace: Option<&'t dyn PipelineTrace>,
    capture: Option<&'t dyn ActionDataCapture>,
}

impl<'t> Tracer<'t> {
    pub(crate) fn new(trace: Option<&'t dyn PipelineTrace>) -> Self {
        Self {
            trace,
            capture: trace.and_then(|trace| trace.action_capture()),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.trace.is_some()
    }

    pub(crate) fn is_traced(&self, action_id: &str) -> bool {
        self.capture
            .is_some_and(|capture| capture.is_action_traced(action_id))
    }

    /// Builds and sends a payload if `action_id` is traced.
    pub(crate) fn capture<P: serde::Serialize>(
        &self,
        stage: PipelineStage,
        action_id: &str,
        payload: impl FnOnce() -> P,
    ) {
        let Some(capture) = self.capture else {
            return;
        };
        if !capture.is_action_traced(action_id) {
            return;
        }
        let sent = serde_json::to_value(payload())
            .map_err(|err| TraceError::Payload(err.to_string()))
            .and_then(|payload| capture.capture_action_data(stage, action_id, payload));
        if let Err(err) = sent {
            tracing::debug!(%stage, action = action_id, error = %err, "trace capture failed");
        }
    }

    pub(crate) fn stage_completed(&self, stage: PipelineStage, remaining: usize) {
        if let Some(trace) = self.trace {
            trace.stage_completed(stage, remaining);
        }
    }
}

/// Milliseconds since the Unix epoch, for payload timestamps.
pub(crate) fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_patterns() {
        let filter = TraceFilter::new(["core:unlock", "magic:*"]);
        assert!(filter.matches("core:unlock"));
        assert!(filter.matches("magic:fireball"));
        assert!(!filter.matches("core:wait"));
        assert!(TraceFilter::all().matches("anything"));
        assert!(!TraceFilter::default().matches("core:unlock"));
    }

    #[test]
    fn tracer_only_captures_filtered_actions() {
        let trace = ActionTrace::new(TraceFilter::new(["core:look"]));
        let tracer = Tracer::new(Some(&trace));

        tracer.capture(PipelineStage::ComponentFiltering, "core:look", || json!({ "ok": true }));
        tracer.capture(PipelineStage::ComponentFiltering, "core:wait", || -> Value {
            panic!("payload must not be built for untraced actions")
        });

        let captures = trace.captures();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].action_id, "core:look");
        assert_eq!(
            trace.payload(PipelineStage::ComponentFiltering, "core:look"),
            Some(json!({ "ok": true }))
        );
    }

    struct Plain;

    impl PipelineTrace for Plain {}

    #[test]
    fn trace_without_capture_capability_is_silent() {
        let tracer = Tracer::new(Some(&Plain));
        assert!(tracer.is_enabled());
        assert!(!tracer.is_traced("core:look"));
    }
}
