use std::time::Duration;

/// Tunable parameters for a discovery run.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Wall-clock budget for one actor's evaluation, in milliseconds.
    /// `None` disables the deadline.
    pub evaluation_budget_ms: Option<u64>,

    /// Action-level combination cap used when a definition declares none.
    pub default_max_combinations: usize,

    /// Record per-stage counts and timings even when no trace is supplied.
    pub collect_diagnostics: bool,

    /// Maximum nesting of `condition_ref` expansions.
    pub max_condition_depth: usize,
}

impl PipelineConfig {
    pub const DEFAULT_MAX_COMBINATIONS: usize = 64;
    pub const DEFAULT_MAX_CONDITION_DEPTH: usize = 16;

    pub fn new() -> Self {
        Self {
            evaluation_budget_ms: None,
            default_max_combinations: Self::DEFAULT_MAX_COMBINATIONS,
            collect_diagnostics: false,
            max_condition_depth: Self::DEFAULT_MAX_CONDITION_DEPTH,
        }
    }

    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.evaluation_budget_ms = Some(u64::try_from(budget.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.collect_diagnostics = enabled;
        self
    }

    /// Returns the evaluation budget as a [`Duration`].
    pub fn budget(&self) -> Option<Duration> {
        self.evaluation_budget_ms.map(Duration::from_millis)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}
