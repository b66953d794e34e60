use std::path::PathBuf;
use std::sync::Arc;

use game_content::{ModLoader, WorldLoader};
use game_core::{
    ActionCatalog, ActionSpec, CustomOperator, EntitySnapshot, EntityStore, EvaluationContext,
    Logic, LogicError, OperatorRegistry, PipelineConfig, PipelineResult, PipelineStage,
    PipelineStatus, PrerequisiteRule, ScopeRegistry, TraceFilter,
};
use runtime::{DiscoveryService, DiscoveryWorld, RuntimeConfig, TraceEvent};
use serde_json::{Value, json};

fn content_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../game/content/data")
}

fn hall_world() -> DiscoveryWorld {
    let content = ModLoader::new(content_dir())
        .with_mods(["core"])
        .load()
        .expect("bundled content loads");
    let snapshot =
        WorldLoader::load(&content_dir().join("worlds/hall.json")).expect("hall world loads");

    DiscoveryWorld::new(snapshot.store, content.scopes.clone(), content.build_catalog().catalog)
        .with_world(snapshot.world)
        .with_conditions(content.conditions)
}

fn commands(result: &PipelineResult) -> Vec<&str> {
    result.actions.iter().map(|action| action.command.as_str()).collect()
}

#[tokio::test]
async fn results_follow_request_order() {
    let service = DiscoveryService::new(hall_world(), RuntimeConfig::default());

    let results = service
        .discover_all(["core:guard", "core:hero", "core:ghost"])
        .await
        .expect("batch runs");

    let actors: Vec<_> = results.iter().map(|r| r.actor_id.as_str()).collect();
    assert_eq!(actors, vec!["core:guard", "core:hero", "core:ghost"]);

    assert_eq!(commands(&results[0]), vec!["wait", "greet Hero"]);
    assert_eq!(
        commands(&results[1]),
        vec!["wait", "take apple", "greet guard", "unlock oak chest with brass key"]
    );
    assert!(results[2].is_failed());

    let metrics = service.metrics().snapshot();
    assert_eq!(metrics.evaluations, 3);
    assert_eq!(metrics.failed, 1);
    assert_eq!(metrics.actions_discovered, 6);
    assert_eq!(metrics.in_flight, 0);
}

#[tokio::test]
async fn concurrency_is_bounded() {
    let config = RuntimeConfig {
        max_concurrent_evaluations: 2,
        ..RuntimeConfig::default()
    };
    let service = DiscoveryService::new(hall_world(), config);

    let actors = ["core:hero", "core:guard"].repeat(6);
    let results = service.discover_all(actors).await.unwrap();

    assert_eq!(results.len(), 12);
    assert!(results.iter().all(PipelineResult::is_completed));
    assert!(service.metrics().peak_in_flight() <= 2);
}

struct Explode;

impl CustomOperator for Explode {
    fn name(&self) -> &str {
        "explode"
    }

    fn evaluate(&self, _args: &[Value], ctx: &EvaluationContext<'_>) -> Result<Value, LogicError> {
        if ctx.actor().id.as_str() == "core:bomb" {
            panic!("operator blew up");
        }
        Ok(Value::Bool(true))
    }
}

#[tokio::test]
async fn panicking_evaluation_fails_only_its_actor() {
    let store = EntityStore::from_entities([
        EntitySnapshot::new("core:hero"),
        EntitySnapshot::new("core:bomb"),
    ]);
    let catalog = ActionCatalog::build([ActionSpec::new("core:fuse").with_prerequisite(
        PrerequisiteRule::new(Logic::parse(json!({ "explode": [] })).unwrap()),
    )])
    .catalog;
    let mut operators = OperatorRegistry::new();
    operators.register(Explode).unwrap();

    let world =
        DiscoveryWorld::new(store, ScopeRegistry::default(), catalog).with_operators(operators);
    let service = DiscoveryService::new(world, RuntimeConfig::default());

    let results = service.discover_all(["core:bomb", "core:hero"]).await.unwrap();

    assert!(matches!(results[0].status, PipelineStatus::Failed { .. }));
    assert_eq!(results[0].actor_id.as_str(), "core:bomb");
    assert!(results[1].is_completed());
    assert_eq!(results[1].actions.len(), 1);
    assert_eq!(service.metrics().failed(), 1);
}

#[tokio::test]
async fn channel_trace_streams_filtered_actions() {
    let service = DiscoveryService::new(hall_world(), RuntimeConfig::default());
    let (service, mut events) = service.with_channel_trace(TraceFilter::new(["core:take"]));

    let result = service.discover("core:hero").await.unwrap();
    assert!(result.is_completed());

    let mut stages = Vec::new();
    let mut completed = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            TraceEvent::Action(capture) => {
                assert_eq!(capture.action_id, "core:take");
                assert_eq!(capture.payload["actorId"], json!("core:hero"));
                stages.push(capture.stage);
            }
            TraceEvent::StageCompleted { stage, .. } => completed.push(stage),
        }
    }

    let all = vec![
        PipelineStage::ComponentFiltering,
        PipelineStage::TargetResolution,
        PipelineStage::PrerequisiteEvaluation,
    ];
    assert_eq!(stages, all);
    assert_eq!(completed, all);
}

#[tokio::test]
async fn exhausted_budget_reports_timeout() {
    let config = RuntimeConfig {
        pipeline: PipelineConfig::default().with_budget(std::time::Duration::ZERO),
        ..RuntimeConfig::default()
    };
    let service = DiscoveryService::new(Arc::new(hall_world()), config);

    let result = service.discover("core:hero").await.unwrap();

    assert!(result.is_timed_out());
    assert!(result.actions.is_empty());
    assert_eq!(service.metrics().timed_out(), 1);
}
