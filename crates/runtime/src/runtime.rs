//! Concurrent discovery host.
//!
//! [`DiscoveryService`] owns an immutable [`DiscoveryWorld`] behind an `Arc`
//! and evaluates many actors against it at once. Each evaluation runs on the
//! blocking pool; a semaphore bounds how many run concurrently.
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use game_content::ConfigLoader;
use game_core::{
    ActionCatalog, ConditionRegistry, EntityId, EntityStore, Env, OperatorRegistry,
    PipelineConfig, PipelineResult, PipelineTrace, ScopeRegistry, TraceFilter, WorldContext,
};

use crate::api::{Result, RuntimeError};
use crate::trace::{ChannelTraceSink, TraceEvent};
use crate::workers::{DiscoveryMetrics, evaluate};

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub pipeline: PipelineConfig,
    /// Upper bound on evaluations running at the same time. Zero is treated
    /// as one.
    pub max_concurrent_evaluations: usize,
    /// Capacity of the channel opened by
    /// [`DiscoveryService::with_channel_trace`].
    pub trace_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            max_concurrent_evaluations: 8,
            trace_buffer_size: 256,
        }
    }
}

impl RuntimeConfig {
    /// Loads the config from a TOML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        ConfigLoader::load_as(path).map_err(|err| RuntimeError::Config {
            path: path.to_path_buf(),
            message: format!("{err:#}"),
        })
    }
}

/// Everything one discovery run reads, frozen for the lifetime of a service.
#[derive(Clone, Default)]
pub struct DiscoveryWorld {
    pub store: EntityStore,
    pub world: WorldContext,
    pub scopes: ScopeRegistry,
    pub conditions: ConditionRegistry,
    pub operators: OperatorRegistry,
    pub catalog: ActionCatalog,
}

impl DiscoveryWorld {
    pub fn new(store: EntityStore, scopes: ScopeRegistry, catalog: ActionCatalog) -> Self {
        Self {
            store,
            scopes,
            catalog,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_world(mut self, world: WorldContext) -> Self {
        self.world = world;
        self
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: ConditionRegistry) -> Self {
        self.conditions = conditions;
        self
    }

    #[must_use]
    pub fn with_operators(mut self, operators: OperatorRegistry) -> Self {
        self.operators = operators;
        self
    }

    /// Oracle view over this snapshot.
    pub fn env(&self) -> Env<'_> {
        Env::new(&self.store, &self.scopes)
            .with_conditions(&self.conditions)
            .with_operators(&self.operators)
            .with_world(&self.world)
    }
}

/// Evaluates actors concurrently against a shared snapshot.
///
/// Cloning is cheap; clones share the snapshot, the concurrency limit, and
/// the metrics.
#[derive(Clone)]
pub struct DiscoveryService {
    world: Arc<DiscoveryWorld>,
    config: RuntimeConfig,
    permits: Arc<Semaphore>,
    metrics: Arc<DiscoveryMetrics>,
    trace: Option<Arc<dyn PipelineTrace>>,
}

impl DiscoveryService {
    pub fn new(world: impl Into<Arc<DiscoveryWorld>>, config: RuntimeConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_evaluations.max(1)));
        Self {
            world: world.into(),
            config,
            permits,
            metrics: Arc::new(DiscoveryMetrics::new()),
            trace: None,
        }
    }

    /// Attaches a trace to every evaluation this service runs.
    #[must_use]
    pub fn with_trace(mut self, trace: Arc<dyn PipelineTrace>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Attaches a [`ChannelTraceSink`] sized by `trace_buffer_size` and
    /// returns the receiving end.
    #[must_use]
    pub fn with_channel_trace(self, filter: TraceFilter) -> (Self, mpsc::Receiver<TraceEvent>) {
        let (sink, events) = ChannelTraceSink::new(filter, self.config.trace_buffer_size);
        (self.with_trace(Arc::new(sink)), events)
    }

    pub fn world(&self) -> &Arc<DiscoveryWorld> {
        &self.world
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<DiscoveryMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Stops accepting work. Evaluations already running finish normally;
    /// later calls return [`RuntimeError::ServiceClosed`].
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Discovers the actions available to a single actor.
    pub async fn discover(&self, actor: impl Into<EntityId>) -> Result<PipelineResult> {
        let mut results = self.discover_all([actor.into()]).await?;
        results.pop().ok_or(RuntimeError::ServiceClosed)
    }

    /// Discovers actions for every actor in `actors`.
    ///
    /// Results come back in request order regardless of completion order.
    /// An evaluation that panics yields a `failed` result for its actor and
    /// leaves the others untouched.
    pub async fn discover_all<I>(&self, actors: I) -> Result<Vec<PipelineResult>>
    where
        I: IntoIterator,
        I::Item: Into<EntityId>,
    {
        let actors: Vec<EntityId> = actors.into_iter().map(Into::into).collect();
        let mut tasks = JoinSet::new();

        for (index, actor) in actors.iter().cloned().enumerate() {
            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|_| RuntimeError::ServiceClosed)?;
            let world = Arc::clone(&self.world);
            let config = self.config.pipeline.clone();
            let trace = self.trace.clone();
            let metrics = Arc::clone(&self.metrics);

            tasks.spawn(async move {
                let _permit = permit;
                metrics.evaluation_started();
                let started = Instant::now();

                let blocking_actor = actor.clone();
                let evaluated = tokio::task::spawn_blocking(move || {
                    evaluate(&world, &config, &blocking_actor, trace.as_deref())
                })
                .await;

                let result = match evaluated {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::error!(actor = %actor, "discovery evaluation aborted: {err}");
                        PipelineResult::failed(actor, format!("evaluation aborted: {err}"))
                    }
                };
                metrics.record(&result, started.elapsed());
                (index, result)
            });
        }

        let mut results: Vec<Option<PipelineResult>> = actors.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(RuntimeError::WorkerJoin)?;
            if let Some(slot) = results.get_mut(index) {
                *slot = Some(result);
            }
        }

        tracing::debug!(actors = actors.len(), "discovery batch finished");
        Ok(results.into_iter().flatten().collect())
    }
}
