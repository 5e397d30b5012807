use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/editor.json";

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,
    #[serde(default = "WindowConfig::default_width")]
    pub width: u32,
    #[serde(default = "WindowConfig::default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "PathsConfig::default_games_dir")]
    pub games_dir: PathBuf,
    #[serde(default = "PathsConfig::default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EditorConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub games_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl WindowConfig {
    fn default_title() -> String {
        crate::APP_NAME.to_string()
    }

    const fn default_width() -> u32 {
        1280
    }

    const fn default_height() -> u32 {
        720
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: Self::default_title(), width: Self::default_width(), height: Self::default_height() }
    }
}

impl PathsConfig {
    fn default_games_dir() -> PathBuf {
        PathBuf::from("games")
    }

    fn default_data_dir() -> PathBuf {
        PathBuf::from("data")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { games_dir: Self::default_games_dir(), data_dir: Self::default_data_dir() }
    }
}

impl EditorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("Config load error: {err:#}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &EditorConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(games_dir) = &overrides.games_dir {
            self.paths.games_dir = games_dir.clone();
        }
        if let Some(data_dir) = &overrides.data_dir {
            self.paths.data_dir = data_dir.clone();
        }
    }
}

impl EditorConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.games_dir.is_none() && self.data_dir.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.games_dir.is_some() {
            fields.push("games_dir");
        }
        if self.data_dir.is_some() {
            fields.push("data_dir");
        }
        fields
    }
}
