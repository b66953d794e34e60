//! Channel-backed pipeline trace.
//!
//! [`ChannelTraceSink`] forwards trace data into a bounded tokio channel so a
//! consumer task can persist or display it. Sending never blocks the
//! pipeline: when the consumer falls behind, events are dropped and the
//! pipeline logs the [`TraceError`] it gets back.
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};

use game_core::{
    ActionDataCapture, PipelineStage, PipelineTrace, TraceError, TraceFilter,
    pipeline::CapturedAction,
};

/// One event emitted by a traced discovery run.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Action(CapturedAction),
    StageCompleted { stage: PipelineStage, remaining: usize },
}

/// Trace that pushes events into a bounded `mpsc` channel.
#[derive(Clone, Debug)]
pub struct ChannelTraceSink {
    filter: TraceFilter,
    sender: mpsc::Sender<TraceEvent>,
}

impl ChannelTraceSink {
    /// Creates a sink and the receiver for its events. `buffer` is clamped to
    /// at least one slot.
    pub fn new(filter: TraceFilter, buffer: usize) -> (Self, mpsc::Receiver<TraceEvent>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { filter, sender }, receiver)
    }

    /// Wraps an existing sender, e.g. one shared by several sinks.
    pub fn from_sender(filter: TraceFilter, sender: mpsc::Sender<TraceEvent>) -> Self {
        Self { filter, sender }
    }

    pub fn filter(&self) -> &TraceFilter {
        &self.filter
    }

    fn send(&self, event: TraceEvent) -> Result<(), TraceError> {
        self.sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => TraceError::Full,
            TrySendError::Closed(_) => TraceError::Closed,
        })
    }
}

impl ActionDataCapture for ChannelTraceSink {
    fn is_action_traced(&self, action_id: &str) -> bool {
        self.filter.matches(action_id)
    }

    fn capture_action_data(
        &self,
        stage: PipelineStage,
        action_id: &str,
        payload: Value,
    ) -> Result<(), TraceError> {
        self.send(TraceEvent::Action(CapturedAction {
            stage,
            action_id: action_id.to_owned(),
            payload,
        }))
    }
}

impl PipelineTrace for ChannelTraceSink {
    fn action_capture(&self) -> Option<&dyn ActionDataCapture> {
        Some(self)
    }

    fn stage_completed(&self, stage: PipelineStage, remaining: usize) {
        if let Err(err) = self.send(TraceEvent::StageCompleted { stage, remaining }) {
            tracing::debug!(%stage, "dropped stage trace event: {err}");
        }
    }
}
