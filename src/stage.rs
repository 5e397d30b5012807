use crate::game::{GameType, Template};
use crate::parameter::Parameter;
use crate::transform::{Transform, TransformData};
use anyhow::{anyhow, bail, Context, Result};
use glam::Quat;
use log::{debug, warn};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub const SET_FILE_SUFFIX: &str = ".set.json";

/// Runtime identity of a placed object. Not persisted; a fresh id is minted whenever an
/// object enters a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HelperId(Uuid);

impl HelperId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HelperId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HelperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Helper({})", self.0)
    }
}

/// A transform that can be selected without selecting an owning object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformRef {
    /// One of an object's extra child transforms.
    Child { object: ObjectId, index: usize },
    /// A stage-level helper with no parent object.
    Helper(HelperId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub object_type: String,
    pub transform: Transform,
    pub parameters: Vec<Parameter>,
    pub children: Vec<Transform>,
}

impl SceneObject {
    pub fn new(object_type: impl Into<String>, transform: Transform) -> Self {
        Self {
            id: ObjectId::new(),
            object_type: object_type.into(),
            transform,
            parameters: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters = parameters.into_iter().collect();
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Transform>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    fn from_data(data: SetObjectData) -> Self {
        Self {
            id: ObjectId::new(),
            object_type: data.object_type,
            transform: data.transform.into(),
            parameters: data.parameters,
            children: data.children.into_iter().map(Transform::from).collect(),
        }
    }

    fn to_data(&self) -> SetObjectData {
        SetObjectData {
            object_type: self.object_type.clone(),
            transform: TransformData::from(&self.transform),
            parameters: self.parameters.clone(),
            children: self.children.iter().map(TransformData::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HelperTransform {
    pub id: HelperId,
    pub name: String,
    pub transform: Transform,
}

impl HelperTransform {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self { id: HelperId::new(), name: name.into(), transform }
    }
}

/// One persisted set file worth of objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetLayer {
    pub name: String,
    pub objects: Vec<SceneObject>,
    pub helpers: Vec<HelperTransform>,
}

impl SetLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), objects: Vec::new(), helpers: Vec::new() }
    }

    pub fn with_object(mut self, object: SceneObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_helper(mut self, helper: HelperTransform) -> Self {
        self.helpers.push(helper);
        self
    }

    fn from_file(name: String, file: SetLayerFile) -> Result<Self> {
        if let Some(issue) =
            file.transform_issues(&name).into_iter().find(|issue| issue.problem == TransformProblem::NonFinitePosition)
        {
            bail!("{issue}");
        }
        for (index, object) in file.objects.iter().enumerate() {
            if let Some(param) = object.parameters.iter().position(|param| !param.data.is_finite()) {
                bail!("layer '{name}': object {index} '{}' parameter {param} is not finite", object.object_type);
            }
        }
        Ok(Self {
            name,
            objects: file.objects.into_iter().map(SceneObject::from_data).collect(),
            helpers: file
                .helpers
                .into_iter()
                .map(|helper| HelperTransform::new(helper.name, helper.transform.into()))
                .collect(),
        })
    }

    fn to_file(&self) -> SetLayerFile {
        SetLayerFile {
            objects: self.objects.iter().map(SceneObject::to_data).collect(),
            helpers: self
                .helpers
                .iter()
                .map(|helper| HelperData {
                    name: helper.name.clone(),
                    transform: TransformData::from(&helper.transform),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SetLayerFile {
    #[serde(default)]
    objects: Vec<SetObjectData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    helpers: Vec<HelperData>,
}

impl SetLayerFile {
    fn transform_issues(&self, layer: &str) -> Vec<TransformIssue> {
        let mut issues = Vec::new();
        for (index, object) in self.objects.iter().enumerate() {
            let owner = format!("object {index} '{}'", object.object_type);
            check_transform(&mut issues, layer, &owner, &object.transform);
            for (child, transform) in object.children.iter().enumerate() {
                check_transform(&mut issues, layer, &format!("{owner} child {child}"), transform);
            }
        }
        for helper in &self.helpers {
            check_transform(&mut issues, layer, &format!("helper '{}'", helper.name), &helper.transform);
        }
        issues
    }
}

fn check_transform(issues: &mut Vec<TransformIssue>, layer: &str, owner: &str, data: &TransformData) {
    let mut push = |problem| {
        issues.push(TransformIssue { layer: layer.to_string(), owner: owner.to_string(), problem });
    };
    let position = &data.position;
    if ![position.x, position.y, position.z].iter().all(|value| value.is_finite()) {
        push(TransformProblem::NonFinitePosition);
    }
    let rotation = &data.rotation;
    let quat = Quat::from_xyzw(rotation.x, rotation.y, rotation.z, rotation.w);
    if !quat.is_finite() || !quat.length_squared().is_finite() {
        push(TransformProblem::NonFiniteRotation);
    } else if !quat.is_normalized() {
        push(TransformProblem::NotNormalized);
    }
}

/// What is wrong with a transform as written in a set file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformProblem {
    NonFinitePosition,
    NonFiniteRotation,
    NotNormalized,
}

impl fmt::Display for TransformProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransformProblem::NonFinitePosition => "has a non-finite position",
            TransformProblem::NonFiniteRotation => "has a non-finite rotation",
            TransformProblem::NotNormalized => "has a non-normalized rotation",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformIssue {
    pub layer: String,
    /// e.g. `object 0 'Ring' child 1` or `helper 'spawn'`
    pub owner: String,
    pub problem: TransformProblem,
}

impl fmt::Display for TransformIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer '{}': {} {}", self.layer, self.owner, self.problem)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SetObjectData {
    #[serde(rename = "type")]
    object_type: String,
    #[serde(default)]
    transform: TransformData,
    #[serde(default)]
    parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<TransformData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HelperData {
    name: String,
    #[serde(default)]
    transform: TransformData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveReport {
    pub files: usize,
    pub objects: usize,
}

/// The loaded unit of level content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage {
    pub id: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub game: Option<Arc<GameType>>,
    pub layers: Vec<SetLayer>,
}

impl Stage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(id: impl Into<String>, data_dir: impl Into<PathBuf>, game: Option<Arc<GameType>>) -> Self {
        Self { id: Some(id.into()), data_dir: Some(data_dir.into()), game, layers: Vec::new() }
    }

    pub fn with_layer(mut self, layer: SetLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.layers.iter().flat_map(|layer| layer.objects.iter())
    }

    pub fn helpers(&self) -> impl Iterator<Item = &HelperTransform> {
        self.layers.iter().flat_map(|layer| layer.helpers.iter())
    }

    pub fn object_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.objects.len()).sum()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects().find(|object| object.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.layers.iter_mut().flat_map(|layer| layer.objects.iter_mut()).find(|object| object.id == id)
    }

    pub fn helper(&self, id: HelperId) -> Option<&HelperTransform> {
        self.helpers().find(|helper| helper.id == id)
    }

    pub fn helper_mut(&mut self, id: HelperId) -> Option<&mut HelperTransform> {
        self.layers.iter_mut().flat_map(|layer| layer.helpers.iter_mut()).find(|helper| helper.id == id)
    }

    pub fn transform(&self, reference: TransformRef) -> Option<&Transform> {
        match reference {
            TransformRef::Child { object, index } => self.object(object)?.children.get(index),
            TransformRef::Helper(id) => self.helper(id).map(|helper| &helper.transform),
        }
    }

    pub fn transform_mut(&mut self, reference: TransformRef) -> Option<&mut Transform> {
        match reference {
            TransformRef::Child { object, index } => self.object_mut(object)?.children.get_mut(index),
            TransformRef::Helper(id) => self.helper_mut(id).map(|helper| &mut helper.transform),
        }
    }

    /// Template for `object_type` in the active game, if both exist.
    pub fn template_for(&self, object_type: &str) -> Option<&Template> {
        self.game.as_deref()?.template(object_type)
    }

    pub fn unit_multiplier(&self) -> f32 {
        self.game.as_ref().map(|game| game.unit_multiplier).unwrap_or(1.0)
    }

    pub fn stage_dir(&self) -> Option<PathBuf> {
        match (&self.data_dir, &self.id) {
            (Some(dir), Some(id)) => Some(dir.join(id)),
            _ => None,
        }
    }

    /// Content hash of the persisted form; two stages with equal fingerprints save identically.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for layer in &self.layers {
            hasher.update(layer.name.as_bytes());
            hasher.update(&[0]);
            match serde_json::to_vec(&layer.to_file()) {
                Ok(bytes) => {
                    hasher.update(&bytes);
                }
                Err(err) => warn!("Failed to serialize layer '{}' for fingerprint: {err}", layer.name),
            }
        }
        hasher.finalize()
    }

    /// Reads every set file of `stage_id` under `data_dir`.
    pub fn load(data_dir: impl AsRef<Path>, stage_id: &str, game: Option<Arc<GameType>>) -> Result<Self> {
        Self::load_with_progress(data_dir, stage_id, game, |_, _| {})
    }

    /// Like [`Stage::load`], calling `on_progress(done, total)` after each set file.
    pub fn load_with_progress<F>(
        data_dir: impl AsRef<Path>,
        stage_id: &str,
        game: Option<Arc<GameType>>,
        mut on_progress: F,
    ) -> Result<Self>
    where
        F: FnMut(usize, usize),
    {
        let data_dir = data_dir.as_ref();
        let set_paths = set_file_paths(data_dir, stage_id)?;
        let total = set_paths.len();
        let mut stage = Stage::new(stage_id, data_dir, game);
        for (done, path) in set_paths.iter().enumerate() {
            let (name, file) = read_set_file(path)?;
            debug!("Loaded set layer '{name}' ({} objects)", file.objects.len());
            let layer =
                SetLayer::from_file(name, file).with_context(|| format!("Loading set file {}", path.display()))?;
            stage.layers.push(layer);
            on_progress(done + 1, total);
        }
        Ok(stage)
    }

    /// Writes every layer back to `data_dir/id/<layer>.set.json`.
    pub fn save_sets(&self) -> Result<SaveReport> {
        let (Some(id), Some(stage_dir)) = (&self.id, self.stage_dir()) else {
            bail!("No stage is loaded; nothing to save");
        };
        validate_stage_id(id)?;
        fs::create_dir_all(&stage_dir)
            .with_context(|| format!("Creating stage directory {}", stage_dir.display()))?;
        let mut report = SaveReport::default();
        for layer in &self.layers {
            let path = stage_dir.join(format!("{}{SET_FILE_SUFFIX}", layer.name));
            let json = serde_json::to_string_pretty(&layer.to_file())?;
            fs::write(&path, json.as_bytes()).with_context(|| format!("Writing set file {}", path.display()))?;
            report.files += 1;
            report.objects += layer.objects.len();
        }
        Ok(report)
    }

    /// Reports suspicious transforms of every set file as written on disk, before any
    /// normalization done by [`Stage::load`].
    pub fn check_set_transforms(data_dir: impl AsRef<Path>, stage_id: &str) -> Result<Vec<TransformIssue>> {
        let mut issues = Vec::new();
        for path in set_file_paths(data_dir.as_ref(), stage_id)? {
            let (name, file) = read_set_file(&path)?;
            issues.extend(file.transform_issues(&name));
        }
        Ok(issues)
    }
}

/// A stage id names exactly one directory below the data directory.
pub fn validate_stage_id(stage_id: &str) -> Result<()> {
    if stage_id.trim().is_empty() {
        bail!("Stage id must not be empty");
    }
    let mut components = Path::new(stage_id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => bail!("Invalid stage id '{stage_id}': expected a single directory name"),
    }
}

fn set_file_paths(data_dir: &Path, stage_id: &str) -> Result<Vec<PathBuf>> {
    validate_stage_id(stage_id)?;
    let stage_dir = data_dir.join(stage_id);
    if !stage_dir.is_dir() {
        bail!("Stage directory {} does not exist", stage_dir.display());
    }
    let entries =
        fs::read_dir(&stage_dir).with_context(|| format!("Reading stage directory {}", stage_dir.display()))?;
    let mut set_paths = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Listing {}", stage_dir.display()))?.path();
        if layer_name(&path).is_some() {
            set_paths.push(path);
        }
    }
    set_paths.sort();
    if set_paths.is_empty() {
        warn!("Stage '{stage_id}' has no set files in {}", stage_dir.display());
    }
    Ok(set_paths)
}

fn read_set_file(path: &Path) -> Result<(String, SetLayerFile)> {
    let name = layer_name(path).ok_or_else(|| anyhow!("{} is not a set file", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("Reading set file {}", path.display()))?;
    let file = serde_json::from_slice::<SetLayerFile>(&bytes)
        .with_context(|| format!("Parsing set file {}", path.display()))?;
    Ok((name, file))
}

fn layer_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.strip_suffix(SET_FILE_SUFFIX)?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

struct StageSlot {
    stage: RwLock<Stage>,
    generation: AtomicU64,
}

/// Shared handle to the active stage.
///
/// Loads build a complete [`Stage`] off-lock and install it with [`StageContext::replace`], so
/// readers only ever see a fully loaded stage. The generation increments on every swap.
#[derive(Clone)]
pub struct StageContext {
    slot: Arc<StageSlot>,
}

impl Default for StageContext {
    fn default() -> Self {
        Self::new(Stage::empty())
    }
}

impl StageContext {
    pub fn new(stage: Stage) -> Self {
        Self { slot: Arc::new(StageSlot { stage: RwLock::new(stage), generation: AtomicU64::new(0) }) }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Stage> {
        self.slot.stage.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Stage> {
        self.slot.stage.write()
    }

    /// Installs `stage`, returning the new generation.
    pub fn replace(&self, stage: Stage) -> u64 {
        let mut guard = self.slot.stage.write();
        *guard = stage;
        self.slot.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn generation(&self) -> u64 {
        self.slot.generation.load(Ordering::Acquire)
    }
}

impl fmt::Debug for StageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageContext").field("generation", &self.generation()).finish_non_exhaustive()
    }
}
