pub mod cli;
pub mod config;
pub mod game;
pub mod inspector;
pub mod numeric_field;
pub mod orchestrator;
pub mod parameter;
pub mod selection;
pub mod session;
pub mod stage;
pub mod transform;
pub mod viewport;

pub use session::{EditError, EditorSession, StatusBar};
pub use stage::{Stage, StageContext};

/// Program name shown in window titles.
pub const APP_NAME: &str = "Stagehand";
