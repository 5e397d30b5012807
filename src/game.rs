use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const fn default_unit_multiplier() -> f32 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateParam {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl TemplateParam {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into() }
    }
}

/// Per-object-type parameter schema. Purely descriptive: an object may carry more or fewer
/// parameters than its template lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub parameters: Vec<TemplateParam>,
}

impl Template {
    pub fn new(parameters: Vec<TemplateParam>) -> Self {
        Self { parameters }
    }

    pub fn parameter(&self, index: usize) -> Option<&TemplateParam> {
        self.parameters.get(index)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameType {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// World units per editor unit; applied when the camera frames a selection.
    #[serde(default = "default_unit_multiplier")]
    pub unit_multiplier: f32,
    #[serde(default)]
    pub templates: BTreeMap<String, Template>,
}

impl GameType {
    pub fn new(id: impl Into<String>, unit_multiplier: f32) -> Self {
        let id = id.into();
        Self { name: id.clone(), id, unit_multiplier, templates: BTreeMap::new() }
    }

    pub fn with_template(mut self, object_type: impl Into<String>, template: Template) -> Self {
        self.templates.insert(object_type.into(), template);
        self
    }

    pub fn template(&self, object_type: &str) -> Option<&Template> {
        self.templates.get(object_type)
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Reading game definition {}", path.display()))?;
        let game = serde_json::from_slice::<GameType>(&bytes)
            .with_context(|| format!("Parsing game definition {}", path.display()))?;
        Ok(game)
    }
}

/// Game definitions known to the editor, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct GameRegistry {
    games: BTreeMap<String, Arc<GameType>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` definition in `dir`. Broken files are skipped with a warning; a
    /// missing directory yields an empty registry.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new();
        if !dir.exists() {
            info!("No game definitions at {}", dir.display());
            return Ok(registry);
        }
        let entries =
            fs::read_dir(dir).with_context(|| format!("Reading game definition directory {}", dir.display()))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.with_context(|| format!("Listing {}", dir.display()))?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        for path in paths {
            match GameType::load(&path) {
                Ok(game) => {
                    info!("Loaded game definition '{}' ({} templates)", game.id, game.templates.len());
                    registry.insert(game);
                }
                Err(err) => warn!("Skipping game definition {}: {err:?}", path.display()),
            }
        }
        Ok(registry)
    }

    pub fn insert(&mut self, game: GameType) -> Arc<GameType> {
        let game = Arc::new(game);
        self.games.insert(game.id.clone(), Arc::clone(&game));
        game
    }

    pub fn get(&self, id: &str) -> Option<Arc<GameType>> {
        self.games.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.games.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
