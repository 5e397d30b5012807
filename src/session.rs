//! The editor session: selection, inspector, status and title state around a shared stage.
//!
//! Hosts call [`EditorSession::on_idle`] from their event loop. It drains finished background
//! jobs first and then renders one viewport frame.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::EditorConfig;
use crate::game::GameRegistry;
use crate::inspector::InspectorView;
use crate::numeric_field::{parse_committed, FieldId};
use crate::orchestrator::{
    JobCompletion, JobKind, JobOutcome, LoadRequest, LoadSaveOrchestrator, OrchestratorError, OrchestratorEvent,
    OrchestratorState,
};
use crate::selection::{SelectableEntity, SelectionMode, SelectionSet};
use crate::stage::{Stage, StageContext};
use crate::viewport::{EditorCamera, RenderFrame, Viewport, ViewportSize};
use crate::APP_NAME;

const UNTITLED: &str = "Untitled";

#[derive(Debug, Error)]
pub enum EditError {
    #[error("the stage is busy with a {0}")]
    StageBusy(JobKind),
    #[error("no single transform is selected")]
    NoActiveTransform,
    #[error("no single object is selected")]
    NoActiveObject,
    #[error("parameter {index} is out of range ({count} parameters)")]
    ParameterOutOfRange { index: usize, count: usize },
    #[error("unknown game '{0}'")]
    UnknownGame(String),
    #[error("invalid value: {0:#}")]
    InvalidValue(anyhow::Error),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBar {
    pub text: String,
    pub progress_visible: bool,
    /// 0..=100
    pub progress: u8,
}

pub struct EditorSession {
    config: EditorConfig,
    games: GameRegistry,
    stage: StageContext,
    selection: SelectionSet,
    inspector: InspectorView,
    orchestrator: LoadSaveOrchestrator,
    status: StatusBar,
    title_stage: Option<String>,
    camera: EditorCamera,
    viewport: Box<dyn Viewport>,
    saved_fingerprint: Option<blake3::Hash>,
    focused_field: Option<FieldId>,
}

impl EditorSession {
    pub fn new(config: EditorConfig, games: GameRegistry, mut viewport: Box<dyn Viewport>) -> Self {
        let stage = StageContext::default();
        viewport.resize(ViewportSize::new(config.window.width, config.window.height));
        let saved_fingerprint = Some(stage.read().fingerprint());
        Self {
            config,
            games,
            orchestrator: LoadSaveOrchestrator::new(stage.clone()),
            stage,
            selection: SelectionSet::new(),
            inspector: InspectorView::default(),
            status: StatusBar::default(),
            title_stage: None,
            camera: EditorCamera::default(),
            viewport,
            saved_fingerprint,
            focused_field: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn games(&self) -> &GameRegistry {
        &self.games
    }

    /// Shared handle to the stage; the same one background jobs read and replace.
    pub fn stage(&self) -> &StageContext {
        &self.stage
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn inspector(&self) -> &InspectorView {
        &self.inspector
    }

    pub fn status(&self) -> &StatusBar {
        &self.status
    }

    pub fn camera(&self) -> &EditorCamera {
        &self.camera
    }

    pub fn is_busy(&self) -> bool {
        self.orchestrator.is_busy()
    }

    /// Whether "open" and "save sets" may be triggered.
    pub fn file_actions_enabled(&self) -> bool {
        !self.orchestrator.is_busy()
    }

    pub fn is_dirty(&self) -> bool {
        let current = self.stage.read().fingerprint();
        self.saved_fingerprint != Some(current)
    }

    pub fn title(&self) -> String {
        match &self.title_stage {
            Some(stage_id) if !self.is_busy() && self.is_dirty() => format!("{stage_id}* - {APP_NAME}"),
            Some(stage_id) => format!("{stage_id} - {APP_NAME}"),
            None => format!("{UNTITLED} - {APP_NAME}"),
        }
    }

    fn ensure_idle(&self) -> Result<(), EditError> {
        match self.orchestrator.state() {
            OrchestratorState::Running(kind) => Err(EditError::StageBusy(kind)),
            OrchestratorState::Idle => Ok(()),
        }
    }

    /// Drops the current stage and starts from an empty, untitled one.
    pub fn new_scene(&mut self) -> Result<(), EditError> {
        self.ensure_idle()?;
        let fingerprint = Stage::empty().fingerprint();
        self.stage.replace(Stage::empty());
        self.selection.clear();
        self.viewport.clear();
        self.status = StatusBar::default();
        self.title_stage = None;
        self.focused_field = None;
        self.saved_fingerprint = Some(fingerprint);
        self.refresh();
        info!("Started a new scene");
        Ok(())
    }

    /// Starts loading `stage_id` in the background. File actions stay disabled until it finishes.
    pub fn open_stage(
        &mut self,
        data_dir: impl Into<PathBuf>,
        stage_id: &str,
        game_id: Option<&str>,
    ) -> Result<(), EditError> {
        self.ensure_idle()?;
        let game = match game_id {
            Some(id) => Some(self.games.get(id).ok_or_else(|| EditError::UnknownGame(id.to_string()))?),
            None => None,
        };
        self.orchestrator.request_load(LoadRequest::new(data_dir, stage_id, game))?;
        self.title_stage = Some(stage_id.to_string());
        self.status = StatusBar { text: format!("Loading {stage_id}..."), progress_visible: true, progress: 0 };
        Ok(())
    }

    /// Opens `stage_id` from the configured data directory.
    pub fn open_stage_from_config(&mut self, stage_id: &str, game_id: Option<&str>) -> Result<(), EditError> {
        let data_dir = self.config.paths.data_dir.clone();
        self.open_stage(data_dir, stage_id, game_id)
    }

    pub fn save_sets(&mut self) -> Result<(), EditError> {
        self.ensure_idle()?;
        self.orchestrator.request_save()?;
        self.status = StatusBar { text: "Saving sets...".to_string(), progress_visible: true, progress: 0 };
        Ok(())
    }

    pub fn select<I, E>(&mut self, entities: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<SelectableEntity>,
    {
        self.selection.select(entities);
        self.refresh();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.refresh();
    }

    /// Recomputes the inspector from the current selection and stage.
    pub fn refresh(&mut self) {
        let stage = self.stage.read();
        self.inspector = InspectorView::refresh(&self.selection, &stage);
    }

    /// Moves the camera onto the selected transform.
    pub fn view_selected(&mut self) {
        match self.selection.mode() {
            SelectionMode::None => {}
            SelectionMode::Multiple => {
                debug!("View selected ignored for {} entities", self.selection.count());
            }
            SelectionMode::Single => {
                let stage = self.stage.read();
                match self.selection.active_transform(&stage) {
                    Some(transform) => {
                        self.camera.position = transform.position * stage.unit_multiplier();
                    }
                    None => debug!("View selected: selection no longer resolves"),
                }
            }
        }
    }

    pub fn focus_field(&mut self, field: Option<FieldId>) {
        self.focused_field = field;
    }

    pub fn focused_field(&self) -> Option<FieldId> {
        self.focused_field
    }

    /// Commits the text of a position or rotation field to the active transform.
    pub fn commit_field(&mut self, field: FieldId, text: &str) -> Result<f32, EditError> {
        self.ensure_idle()?;
        let value = parse_committed(text);
        {
            let mut stage = self.stage.write();
            let transform = self.selection.active_transform_mut(&mut stage).ok_or(EditError::NoActiveTransform)?;
            match field {
                FieldId::Position(axis) => transform.set_position_axis(axis, value),
                FieldId::Rotation(axis) => transform.set_euler_axis(axis, value),
            }
        }
        debug!("Committed {} = {value}", field.label());
        if self.focused_field == Some(field) {
            self.focused_field = None;
        }
        self.refresh();
        Ok(value)
    }

    /// Re-parses `text` as the same kind of value parameter `index` already holds.
    pub fn set_parameter(&mut self, index: usize, text: &str) -> Result<(), EditError> {
        self.ensure_idle()?;
        {
            let mut stage = self.stage.write();
            let object = self.selection.active_object_mut(&mut stage).ok_or(EditError::NoActiveObject)?;
            let count = object.parameters.len();
            let param = object.parameters.get_mut(index).ok_or(EditError::ParameterOutOfRange { index, count })?;
            param.data = param.data.parse_like(text).map_err(EditError::InvalidValue)?;
        }
        self.refresh();
        Ok(())
    }

    /// Drains finished background work, then renders one frame.
    pub fn on_idle(&mut self) {
        while let Some(event) = self.orchestrator.poll() {
            match event {
                OrchestratorEvent::Progress { percent, .. } => {
                    self.status.progress_visible = true;
                    self.status.progress = percent.min(100);
                }
                OrchestratorEvent::Finished(completion) => self.finish_job(completion),
            }
        }
        self.request_render();
    }

    fn finish_job(&mut self, completion: JobCompletion) {
        let JobCompletion { kind, result, .. } = completion;
        self.status.progress_visible = false;
        match result {
            Ok(JobOutcome::Loaded { stage_id, objects, fingerprint, .. }) => {
                info!("Loaded stage '{stage_id}' with {objects} objects");
                self.selection.clear();
                self.saved_fingerprint = Some(fingerprint);
                self.status.text = "Done Loading".to_string();
                self.status.progress = 100;
            }
            Ok(JobOutcome::Saved { report, fingerprint }) => {
                info!("Saved {} set files ({} objects)", report.files, report.objects);
                self.saved_fingerprint = Some(fingerprint);
                self.status.text = "Done Saving".to_string();
                self.status.progress = 100;
            }
            Err(err) => {
                let verb = match kind {
                    JobKind::Load => "load",
                    JobKind::Save => "save",
                };
                warn!("Failed to {verb}: {err:#}");
                self.status.text = format!("Failed to {verb}: {err:#}");
                self.status.progress = 0;
                if kind == JobKind::Load {
                    self.title_stage = self.stage.read().id.clone();
                }
            }
        }
        self.refresh();
    }

    pub fn request_render(&mut self) {
        let stage = self.stage.read();
        let frame = RenderFrame { camera: &self.camera, stage: &stage, stage_generation: self.stage.generation() };
        self.viewport.render(&frame);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport.resize(ViewportSize::new(width, height));
    }

    /// Pumps [`Self::on_idle`] until no job is running or `timeout` passes.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.on_idle();
            if !self.is_busy() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::SelectionControls;
    use crate::parameter::{ParamValue, Parameter};
    use crate::stage::{SceneObject, SetLayer};
    use crate::transform::{Axis, Transform};
    use crate::viewport::HeadlessViewport;
    use glam::Vec3;

    fn session() -> EditorSession {
        EditorSession::new(EditorConfig::default(), GameRegistry::new(), Box::new(HeadlessViewport::new()))
    }

    fn install(session: &mut EditorSession, object: SceneObject) {
        let stage = Stage::new("stg01", "data", None).with_layer(SetLayer::new("base").with_object(object));
        session.saved_fingerprint = Some(stage.fingerprint());
        session.stage().replace(stage);
        session.title_stage = Some("stg01".to_string());
    }

    #[test]
    fn fresh_session_is_untitled_and_clean() {
        let session = session();
        assert_eq!(session.title(), "Untitled - Stagehand");
        assert!(!session.is_dirty());
        assert!(session.file_actions_enabled());
        assert_eq!(session.inspector().selection_label, "0 Object(s) Selected");
    }

    #[test]
    fn committing_fields_marks_stage_dirty() {
        let mut session = session();
        let ring = SceneObject::new("Ring", Transform::default());
        let id = ring.id;
        install(&mut session, ring);
        session.select([id]);
        assert_eq!(session.title(), "stg01 - Stagehand");

        session.focus_field(Some(FieldId::Position(Axis::Y)));
        let value = session.commit_field(FieldId::Position(Axis::Y), "4.5").expect("commit");
        assert_eq!(value, 4.5);
        assert_eq!(session.focused_field(), None);
        assert_eq!(session.inspector().position, ["0", "4.5", "0"]);
        assert!(session.is_dirty());
        assert_eq!(session.title(), "stg01* - Stagehand");

        session.commit_field(FieldId::Rotation(Axis::Z), "garbage").expect("commit");
        assert_eq!(session.inspector().rotation[2], "0");
    }

    #[test]
    fn edits_without_selection_are_rejected() {
        let mut session = session();
        let err = session.commit_field(FieldId::Position(Axis::X), "1").unwrap_err();
        assert!(matches!(err, EditError::NoActiveTransform));
        let err = session.set_parameter(0, "1").unwrap_err();
        assert!(matches!(err, EditError::NoActiveObject));
    }

    #[test]
    fn parameter_edits_keep_their_type() {
        let mut session = session();
        let ring = SceneObject::new("Ring", Transform::default())
            .with_parameters([Parameter::new(ParamValue::Float(5.0)), Parameter::new(ParamValue::Bool(false))]);
        let id = ring.id;
        install(&mut session, ring);
        session.select([id]);
        session.set_parameter(0, "7.25").expect("float edit");
        session.set_parameter(1, "true").expect("bool edit");
        let values: Vec<&str> = session.inspector().parameters.iter().map(|row| row.value.as_str()).collect();
        assert_eq!(values, ["7.25", "true"]);
        assert!(matches!(session.set_parameter(1, "maybe"), Err(EditError::InvalidValue(_))));
        assert!(matches!(session.set_parameter(9, "1"), Err(EditError::ParameterOutOfRange { index: 9, count: 2 })));
    }

    #[test]
    fn view_selected_scales_by_unit_multiplier() {
        let mut session = session();
        let ring = SceneObject::new("Ring", Transform::from_position(Vec3::new(1.0, 2.0, 3.0)));
        let other = SceneObject::new("Ring", Transform::default());
        let (id, other_id) = (ring.id, other.id);
        let game = std::sync::Arc::new(crate::game::GameType::new("demo", 10.0));
        let stage = Stage::new("stg01", "data", Some(game))
            .with_layer(SetLayer::new("base").with_object(ring).with_object(other));
        session.stage().replace(stage);

        session.select([id, other_id]);
        session.view_selected();
        assert_eq!(session.camera().position, Vec3::ZERO);

        session.select([id]);
        assert!(session.inspector().is_enabled(SelectionControls::VIEW_SELECTED));
        session.view_selected();
        assert_eq!(session.camera().position, Vec3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn new_scene_resets_state() {
        let mut session = session();
        let ring = SceneObject::new("Ring", Transform::default());
        let id = ring.id;
        install(&mut session, ring);
        session.select([id]);
        session.new_scene().expect("new scene");
        assert_eq!(session.title(), "Untitled - Stagehand");
        assert!(session.selection().is_empty());
        assert_eq!(session.stage().read().object_count(), 0);
        assert!(!session.is_dirty());
    }

    #[test]
    fn failed_load_reports_and_reenables_actions() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut session = session();
        session.open_stage(dir.path(), "nope", None).expect("load starts");
        assert!(!session.file_actions_enabled());
        assert!(session.status().progress_visible);
        assert!(session.wait_idle(Duration::from_secs(10)));
        assert!(session.file_actions_enabled());
        assert!(!session.status().progress_visible);
        assert!(session.status().text.starts_with("Failed to load: "), "status was {:?}", session.status().text);
        assert_eq!(session.title(), "Untitled - Stagehand");
    }

    #[test]
    fn unknown_game_is_rejected_before_spawning() {
        let mut session = session();
        let err = session.open_stage("data", "stg01", Some("missing")).unwrap_err();
        assert!(matches!(err, EditError::UnknownGame(ref id) if id == "missing"));
        assert!(!session.is_busy());
    }
}
