use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{error, info, warn};
use stagehand::cli::CliOptions;
use stagehand::config::{EditorConfig, DEFAULT_CONFIG_PATH};
use stagehand::game::GameRegistry;
use stagehand::viewport::HeadlessViewport;
use stagehand::EditorSession;

const JOB_TIMEOUT: Duration = Duration::from_secs(300);

fn main() {
    let options = match CliOptions::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            process::exit(2);
        }
    };
    let config_path = options.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let loaded = EditorConfig::load(&config_path);
    let filter = loaded.as_ref().ok().and_then(|cfg| cfg.log_filter.clone()).unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let mut config = match loaded {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!("Config load error: {err:#}. Falling back to defaults.");
            EditorConfig::default()
        }
    };
    config.apply_overrides(&options.config_overrides());

    if let Err(err) = run(config, &options) {
        error!("{err:#}");
        process::exit(1);
    }
}

fn run(config: EditorConfig, options: &CliOptions) -> Result<()> {
    let overrides = options.config_overrides();
    if !overrides.is_empty() {
        info!("CLI overrides applied: {}", overrides.applied_fields().join(", "));
    }
    let games = GameRegistry::load_dir(&config.paths.games_dir)?;
    let ids: Vec<&str> = games.ids().collect();
    info!(
        "Loaded {} game definition(s) from {}: {}",
        games.len(),
        config.paths.games_dir.display(),
        ids.join(", ")
    );

    let mut session = EditorSession::new(config, games, Box::new(HeadlessViewport::new()));
    let Some(stage_id) = options.stage.as_deref() else {
        println!("{} (no stage given, nothing to do)", session.title());
        return Ok(());
    };

    session.open_stage_from_config(stage_id, options.game.as_deref())?;
    pump(&mut session)?;
    println!("{}", session.title());
    println!("{}", session.status().text);
    {
        let stage = session.stage().read();
        println!("{} layer(s), {} object(s)", stage.layers.len(), stage.object_count());
    }

    if options.save {
        session.save_sets()?;
        pump(&mut session)?;
        println!("{}", session.status().text);
    }
    Ok(())
}

fn pump(session: &mut EditorSession) -> Result<()> {
    if !session.wait_idle(JOB_TIMEOUT) {
        return Err(anyhow!("background job did not finish within {}s", JOB_TIMEOUT.as_secs()));
    }
    if session.status().text.starts_with("Failed") {
        return Err(anyhow!("{}", session.status().text));
    }
    Ok(())
}
