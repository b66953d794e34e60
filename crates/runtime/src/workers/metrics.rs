//! Discovery metrics and statistics.
//!
//! Tracks evaluation throughput, outcomes, and concurrency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use game_core::{PipelineResult, PipelineStatus};

/// Discovery metrics tracked by the service.
///
/// Uses atomics for lock-free access across worker threads.
#[derive(Debug, Default)]
pub struct DiscoveryMetrics {
    /// Evaluations that produced a result, whatever the status
    evaluations: AtomicU64,

    /// Evaluations that ended in `failed`
    failed: AtomicU64,

    /// Evaluations that ran past their budget
    timed_out: AtomicU64,

    /// Actions returned across all completed evaluations
    actions_discovered: AtomicU64,

    /// Sum of evaluation wall-clock time, in nanoseconds
    total_evaluation_time_nanos: AtomicU64,

    /// Evaluations currently running
    in_flight: AtomicU64,

    /// Peak concurrent evaluations observed
    peak_in_flight: AtomicU64,
}

impl DiscoveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an evaluation as started and tracks the concurrency peak.
    pub fn evaluation_started(&self) {
        let running = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;

        let mut current_peak = self.peak_in_flight.load(Ordering::Relaxed);
        while running > current_peak {
            match self.peak_in_flight.compare_exchange_weak(
                current_peak,
                running,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current_peak = actual,
            }
        }
    }

    /// Records the outcome of an evaluation started with
    /// [`Self::evaluation_started`].
    pub fn record(&self, result: &PipelineResult, elapsed: Duration) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        self.total_evaluation_time_nanos.fetch_add(
            u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
        match result.status {
            PipelineStatus::Completed => {
                self.actions_discovered
                    .fetch_add(result.actions.len() as u64, Ordering::Relaxed);
            }
            PipelineStatus::Failed { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            PipelineStatus::TimedOut => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
            }
        }
        // Saturating: a record without a matching start must not wrap.
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn actions_discovered(&self) -> u64 {
        self.actions_discovered.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn peak_in_flight(&self) -> u64 {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    /// Calculates average evaluation time.
    pub fn avg_evaluation_time(&self) -> Duration {
        let evaluations = self.evaluations();
        if evaluations == 0 {
            Duration::ZERO
        } else {
            let total_nanos = self.total_evaluation_time_nanos.load(Ordering::Relaxed);
            Duration::from_nanos(total_nanos / evaluations)
        }
    }

    /// Creates a snapshot of all metrics for display/logging.
    ///
    /// Individual fields are read atomically; the snapshot as a whole may mix
    /// values from concurrent updates.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            evaluations: self.evaluations(),
            failed: self.failed(),
            timed_out: self.timed_out(),
            actions_discovered: self.actions_discovered(),
            in_flight: self.in_flight(),
            peak_in_flight: self.peak_in_flight(),
            avg_evaluation_time: self.avg_evaluation_time(),
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub evaluations: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub actions_discovered: u64,
    pub in_flight: u64,
    pub peak_in_flight: u64,
    pub avg_evaluation_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::{DiscoveredAction, EntityId};

    fn completed(actions: usize) -> PipelineResult {
        let mut result = PipelineResult::completed(EntityId::from("core:hero"));
        result.actions = (0..actions)
            .map(|i| DiscoveredAction {
                action_id: format!("core:a{i}"),
                name: "A".into(),
                command: "a".into(),
                bindings: Default::default(),
            })
            .collect();
        result
    }

    #[test]
    fn records_outcomes_by_status() {
        let metrics = DiscoveryMetrics::new();

        metrics.evaluation_started();
        metrics.evaluation_started();
        metrics.record(&completed(3), Duration::from_millis(4));
        metrics.evaluation_started();
        metrics.record(
            &PipelineResult::failed(EntityId::from("core:ghost"), "missing"),
            Duration::from_millis(2),
        );

        let mut timed_out = completed(0);
        timed_out.status = PipelineStatus::TimedOut;
        metrics.record(&timed_out, Duration::from_millis(6));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.evaluations, 3);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.timed_out, 1);
        assert_eq!(snapshot.actions_discovered, 3);
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.peak_in_flight, 2);
        assert_eq!(snapshot.avg_evaluation_time, Duration::from_millis(4));
    }

    #[test]
    fn empty_metrics_have_zero_average() {
        assert_eq!(DiscoveryMetrics::new().avg_evaluation_time(), Duration::ZERO);
    }
}
