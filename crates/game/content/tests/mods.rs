use std::fs;
use std::path::{Path, PathBuf};

use game_content::{ModLoader, WorldLoader};
use game_core::{ActionDiscovery, DefinitionError, EntityId, Env, PipelineConfig};
use serde_json::json;

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn write(path: PathBuf, content: impl AsRef<[u8]>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn bundled_core_mod_discovers_actions() {
    let content = ModLoader::new(data_dir()).with_mods(["core"]).load().unwrap();
    assert!(content.failures.is_empty(), "{:?}", content.failures);

    let build = content.build_catalog();
    assert!(build.is_clean(), "{:?}", build.rejected);
    let ids: Vec<_> = build.catalog.iter().map(|action| action.id()).collect();
    assert_eq!(ids, vec!["core:wait", "core:take", "core:greet", "core:unlock"]);

    let unlock = build.catalog.get("core:unlock").unwrap();
    assert!(unlock.required_components().contains("core:hands"));
    assert!(unlock.slot("container").unwrap().validation.required_components.contains("core:lock"));

    let snapshot = WorldLoader::load(&data_dir().join("worlds/hall.json")).unwrap();
    let env = Env::new(&snapshot.store, &content.scopes)
        .with_conditions(&content.conditions)
        .with_world(&snapshot.world);
    let result = ActionDiscovery::new(env, PipelineConfig::default()).discover_by_id(
        &EntityId::from("core:hero"),
        &build.catalog,
        None,
    );

    assert!(result.is_completed(), "{:?}", result.status);
    let commands: Vec<_> = result.actions.iter().map(|action| action.command.as_str()).collect();
    assert_eq!(
        commands,
        vec!["wait", "take apple", "greet guard", "unlock oak chest with brass key"]
    );
}

#[test]
fn failures_are_collected_per_file_and_definition() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    let extra = root.path().join("extra");

    write(
        base.join("scopes/here.json"),
        json!({ "id": "base:here", "source": "location" }).to_string(),
    );
    write(
        extra.join("scopes/here.ron"),
        r#"(id: "base:here", source: all)"#,
    );
    write(base.join("scopes/broken.json"), "{ not json");
    write(base.join("actions/README.md"), "ignored");
    write(
        base.join("actions/actions.json"),
        json!([
            { "id": "base:look", "targets": "base:here" },
            { "name": "missing id" },
            {
                "id": "base:tangle",
                "targets": [
                    { "name": "a", "scope": "base:here", "dependsOn": "b" },
                    { "name": "b", "scope": "base:here", "dependsOn": "a" }
                ]
            }
        ])
        .to_string(),
    );

    let content = ModLoader::new(root.path()).load().unwrap();

    let failed: Vec<_> = content
        .failures
        .iter()
        .map(|failure| failure.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(failed, vec!["broken.json", "actions.json"]);

    let here = content.scopes.get("base:here").unwrap();
    assert_eq!(here.source, game_core::ScopeSource::All);

    let build = content.build_catalog();
    assert_eq!(build.catalog.len(), 1);
    assert!(build.catalog.contains("base:look"));
    assert_eq!(build.rejected.len(), 1);
    assert!(matches!(
        build.rejected[0].error,
        DefinitionError::DependencyCycle { .. }
    ));
}

#[test]
fn unknown_mod_is_reported() {
    let root = tempfile::tempdir().unwrap();
    let content = ModLoader::new(root.path()).with_mods(["ghost"]).load().unwrap();
    assert_eq!(content.failures.len(), 1);
    assert!(content.failures[0].error.contains("ghost"));
}

#[test]
fn missing_root_is_an_error() {
    assert!(ModLoader::new("/nonexistent/content").load().is_err());
}
