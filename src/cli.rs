use crate::config::EditorConfigOverrides;
use crate::parameter::parse_bool;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Command-line options of the `stagehand` binary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub games_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub game: Option<String>,
    pub stage: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub save: bool,
}

impl CliOptions {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = CliOptions::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => options.config = Some(PathBuf::from(value)),
                "games-dir" => options.games_dir = Some(PathBuf::from(value)),
                "data-dir" => options.data_dir = Some(PathBuf::from(value)),
                "game" => options.game = Some(value),
                "stage" => options.stage = Some(value),
                "width" => {
                    options.width =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid width '{value}'"))?);
                }
                "height" => {
                    options.height =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid height '{value}'"))?);
                }
                "save" => options.save = parse_bool_flag("save", &value)?,
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --games-dir, --data-dir, --game, --stage, \
                     --width, --height, --save."
                ),
            }
        }
        Ok(options)
    }

    pub fn config_overrides(&self) -> EditorConfigOverrides {
        EditorConfigOverrides {
            width: self.width,
            height: self.height,
            games_dir: self.games_dir.clone(),
            data_dir: self.data_dir.clone(),
        }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    parse_bool(value).ok_or_else(|| anyhow!("Invalid {flag} value '{value}'. Use on/off or true/false."))
}
