use std::fs;
use std::path::Path;
use std::time::Duration;

use stagehand::config::EditorConfig;
use stagehand::game::GameRegistry;
use stagehand::numeric_field::FieldId;
use stagehand::orchestrator::JobKind;
use stagehand::stage::Stage;
use stagehand::transform::Axis;
use stagehand::viewport::HeadlessViewport;
use stagehand::{EditError, EditorSession};
use tempfile::tempdir;

const WAIT: Duration = Duration::from_secs(10);

const DEMO_GAME: &str = r#"{
    "id": "demo",
    "name": "Demo Game",
    "unit_multiplier": 10.0,
    "templates": {
        "Ring": { "parameters": [ { "name": "Radius", "description": "Pickup radius" } ] }
    }
}"#;

const BASE_SET: &str = r#"{
    "objects": [
        {
            "type": "Ring",
            "transform": { "position": { "x": 1.0, "y": 2.0, "z": 3.0 } },
            "parameters": [ { "type": "float", "value": 5.0 } ]
        },
        { "type": "Spring" }
    ],
    "helpers": [ { "name": "spawn", "transform": { "position": { "x": 0.0, "y": 4.0, "z": 0.0 } } } ]
}"#;

fn write_fixture(root: &Path) {
    let games = root.join("games");
    fs::create_dir_all(&games).expect("games dir");
    fs::write(games.join("demo.json"), DEMO_GAME).expect("write game");
    let stage_dir = root.join("data").join("stg01");
    fs::create_dir_all(&stage_dir).expect("stage dir");
    fs::write(stage_dir.join("base.set.json"), BASE_SET).expect("write set");
}

fn session_for(root: &Path) -> EditorSession {
    let mut config = EditorConfig::default();
    config.paths.games_dir = root.join("games");
    config.paths.data_dir = root.join("data");
    let games = GameRegistry::load_dir(&config.paths.games_dir).expect("games load");
    EditorSession::new(config, games, Box::new(HeadlessViewport::new()))
}

#[test]
fn loading_stg01_disables_then_reenables_file_actions() {
    let dir = tempdir().expect("temp dir");
    write_fixture(dir.path());
    let mut session = session_for(dir.path());
    assert_eq!(session.games().len(), 1);

    session.open_stage_from_config("stg01", Some("demo")).expect("load starts");
    assert!(!session.file_actions_enabled());
    assert!(session.status().progress_visible);
    assert_eq!(session.title(), "stg01 - Stagehand");

    assert!(session.wait_idle(WAIT), "load should finish");
    assert!(session.file_actions_enabled());
    assert_eq!(session.status().text, "Done Loading");
    assert!(!session.status().progress_visible);
    assert_eq!(session.status().progress, 100);
    assert!(!session.is_dirty());

    let stage = session.stage().read();
    assert_eq!(stage.id.as_deref(), Some("stg01"));
    assert_eq!(stage.object_count(), 2);
    assert_eq!(stage.helpers().count(), 1);
    assert_eq!(stage.game.as_ref().map(|game| game.display_name()), Some("Demo Game"));
    assert_eq!(session.stage().generation(), 1);
}

#[test]
fn requests_while_running_are_rejected() {
    let dir = tempdir().expect("temp dir");
    write_fixture(dir.path());
    let mut session = session_for(dir.path());

    session.open_stage_from_config("stg01", None).expect("load starts");
    let err = session.open_stage_from_config("stg01", None).unwrap_err();
    assert!(matches!(err, EditError::StageBusy(JobKind::Load)));
    assert!(matches!(session.save_sets(), Err(EditError::StageBusy(JobKind::Load))));
    assert!(matches!(session.new_scene(), Err(EditError::StageBusy(_))));
    assert!(matches!(
        session.commit_field(FieldId::Position(Axis::X), "1"),
        Err(EditError::StageBusy(_))
    ));

    assert!(session.wait_idle(WAIT));
    assert_eq!(session.status().text, "Done Loading");
}

#[test]
fn edit_save_and_reload_round_trips_through_disk() {
    let dir = tempdir().expect("temp dir");
    write_fixture(dir.path());
    let mut session = session_for(dir.path());
    session.open_stage_from_config("stg01", Some("demo")).expect("load starts");
    assert!(session.wait_idle(WAIT));

    let ring_id = session.stage().read().objects().next().map(|object| object.id).expect("ring");
    session.select([ring_id]);
    assert_eq!(session.inspector().parameters[0].label, "Radius");
    session.commit_field(FieldId::Position(Axis::X), "8").expect("edit position");
    session.set_parameter(0, "6.5").expect("edit radius");
    assert!(session.is_dirty());
    assert_eq!(session.title(), "stg01* - Stagehand");

    session.view_selected();
    assert_eq!(session.camera().position.x, 80.0);

    session.save_sets().expect("save starts");
    assert!(!session.file_actions_enabled());
    assert!(session.wait_idle(WAIT));
    assert_eq!(session.status().text, "Done Saving");
    assert!(!session.is_dirty());
    assert_eq!(session.title(), "stg01 - Stagehand");

    let reloaded = Stage::load(dir.path().join("data"), "stg01", None).expect("reload");
    let ring = reloaded.objects().next().expect("ring");
    assert_eq!(ring.transform.position.x, 8.0);
    assert_eq!(ring.parameters[0].display_text(), "6.5");
    assert_eq!(reloaded.helpers().next().map(|helper| helper.name.as_str()), Some("spawn"));
}

#[test]
fn failed_load_keeps_previous_stage() {
    let dir = tempdir().expect("temp dir");
    write_fixture(dir.path());
    let mut session = session_for(dir.path());
    session.open_stage_from_config("stg01", None).expect("load starts");
    assert!(session.wait_idle(WAIT));

    let stage_dir = dir.path().join("data").join("broken");
    fs::create_dir_all(&stage_dir).expect("broken dir");
    fs::write(stage_dir.join("base.set.json"), "{ not json").expect("write broken set");
    session.open_stage_from_config("broken", None).expect("load starts");
    assert!(session.wait_idle(WAIT));

    assert!(session.status().text.starts_with("Failed to load: "));
    assert!(!session.status().progress_visible);
    assert_eq!(session.status().progress, 0);
    assert!(session.file_actions_enabled());
    assert_eq!(session.title(), "stg01 - Stagehand");
    assert_eq!(session.stage().read().id.as_deref(), Some("stg01"));
    assert_eq!(session.stage().generation(), 1);
}

#[test]
fn load_clears_selection() {
    let dir = tempdir().expect("temp dir");
    write_fixture(dir.path());
    let mut session = session_for(dir.path());
    session.open_stage_from_config("stg01", None).expect("load starts");
    assert!(session.wait_idle(WAIT));
    let ring_id = session.stage().read().objects().next().map(|object| object.id).expect("ring");
    session.select([ring_id]);

    session.open_stage_from_config("stg01", None).expect("reload starts");
    assert!(session.wait_idle(WAIT));
    assert!(session.selection().is_empty());
    assert_eq!(session.inspector().selection_label, "0 Object(s) Selected");
}
