use anyhow::{anyhow, Context, Result};
use stagehand::game::{GameRegistry, GameType};
use stagehand::numeric_field::format_number;
use stagehand::stage::Stage;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:?}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };
    match command.as_str() {
        "list" => {
            let data_dir =
                args.next().ok_or_else(|| anyhow!("list requires arguments: stage_tool list <data_dir> <stage>"))?;
            let stage_id = args.next().ok_or_else(|| anyhow!("list missing stage id argument"))?;
            cmd_list(&data_dir, &stage_id)
        }
        "validate" => {
            let data_dir = args.next().ok_or_else(|| {
                anyhow!("validate requires arguments: stage_tool validate <data_dir> <stage> [games_dir game]")
            })?;
            let stage_id = args.next().ok_or_else(|| anyhow!("validate missing stage id argument"))?;
            let game = match (args.next(), args.next()) {
                (Some(games_dir), Some(game_id)) => Some((games_dir, game_id)),
                (None, None) => None,
                _ => return Err(anyhow!("validate takes both a games directory and a game id, or neither")),
            };
            cmd_validate(&data_dir, &stage_id, game)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => Err(anyhow!("unknown command '{other}'")),
    }
}

fn print_usage() {
    eprintln!(
        "Stage Tool

Usage:
  stage_tool list <data_dir> <stage>                       List set layers, objects and helpers
  stage_tool validate <data_dir> <stage> [games_dir game]  Check transforms and parameter templates
  stage_tool help                                          Show this message
"
    );
}

fn cmd_list(data_dir: &str, stage_id: &str) -> Result<()> {
    let stage = load_stage(data_dir, stage_id, None)?;
    println!("{:<16} {:<20} {:<32} {}", "Layer", "Type/Name", "Position", "Params");
    println!("{}", "-".repeat(80));
    for layer in &stage.layers {
        for object in &layer.objects {
            let p = object.transform.position;
            let position = format!("{}, {}, {}", format_number(p.x), format_number(p.y), format_number(p.z));
            println!("{:<16} {:<20} {:<32} {}", layer.name, object.object_type, position, object.parameters.len());
        }
        for helper in &layer.helpers {
            let p = helper.transform.position;
            let position = format!("{}, {}, {}", format_number(p.x), format_number(p.y), format_number(p.z));
            println!("{:<16} {:<20} {:<32} -", layer.name, format!("[{}]", helper.name), position);
        }
    }
    Ok(())
}

fn cmd_validate(data_dir: &str, stage_id: &str, game: Option<(String, String)>) -> Result<()> {
    let game = match game {
        Some((games_dir, game_id)) => {
            let registry = GameRegistry::load_dir(&games_dir)?;
            let game = registry.get(&game_id).ok_or_else(|| {
                let known: Vec<&str> = registry.ids().collect();
                anyhow!("game '{game_id}' not found in '{games_dir}' (known: {})", known.join(", "))
            })?;
            Some(game)
        }
        None => None,
    };
    let normalized = normalize_dir(data_dir);
    let mut issues: Vec<String> = Stage::check_set_transforms(&normalized, stage_id)
        .with_context(|| format!("checking stage '{}' in '{}'", stage_id, normalized.display()))?
        .iter()
        .map(ToString::to_string)
        .collect();
    if !issues.is_empty() {
        return Err(anyhow!("stage '{}' has issues:\n  - {}", stage_id, issues.join("\n  - ")));
    }

    let stage = load_stage(data_dir, stage_id, game)?;
    if stage.game.is_some() {
        for layer in &stage.layers {
            for object in &layer.objects {
                match stage.template_for(&object.object_type) {
                    Some(template) if template.len() != object.parameters.len() => issues.push(format!(
                        "layer '{}': '{}' has {} parameters but its template lists {}",
                        layer.name,
                        object.object_type,
                        object.parameters.len(),
                        template.len()
                    )),
                    Some(_) => {}
                    None => issues.push(format!(
                        "layer '{}': no template for object type '{}'",
                        layer.name, object.object_type
                    )),
                }
            }
        }
    }

    if issues.is_empty() {
        println!(
            "Stage '{}' is valid. Layers: {}  Objects: {}  Helpers: {}",
            stage_id,
            stage.layers.len(),
            stage.object_count(),
            stage.helpers().count()
        );
        Ok(())
    } else {
        Err(anyhow!("stage '{}' has issues:\n  - {}", stage_id, issues.join("\n  - ")))
    }
}

fn normalize_dir(dir: &str) -> PathBuf {
    Path::new(dir).canonicalize().unwrap_or_else(|_| Path::new(dir).to_path_buf())
}

fn load_stage(data_dir: &str, stage_id: &str, game: Option<Arc<GameType>>) -> Result<Stage> {
    let normalized = normalize_dir(data_dir);
    Stage::load(&normalized, stage_id, game)
        .with_context(|| format!("loading stage '{}' from '{}'", stage_id, normalized.display()))
}
