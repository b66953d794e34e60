//! The blocking half of a discovery request.
use game_core::{ActionDiscovery, EntityId, PipelineConfig, PipelineResult, PipelineTrace};

use crate::runtime::DiscoveryWorld;

/// Runs the pipeline for one actor against a shared world snapshot.
///
/// Called from `spawn_blocking`; the pipeline is synchronous and CPU bound.
pub(crate) fn evaluate(
    world: &DiscoveryWorld,
    config: &PipelineConfig,
    actor: &EntityId,
    trace: Option<&dyn PipelineTrace>,
) -> PipelineResult {
    let span = tracing::debug_span!("discover", actor = %actor);
    let _entered = span.enter();

    ActionDiscovery::new(world.env(), config.clone()).discover_by_id(actor, &world.catalog, trace)
}
