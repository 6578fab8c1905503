use crate::config::AppConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config/item_preview.json";
pub const DEFAULT_OUTPUT_PATH: &str = "preview.png";

const SUPPORTED_FLAGS: &str =
    "--item, --version, --out, --config, --time, --width, --height, --data-root, --game-dir, --java";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    pub item: Option<PathBuf>,
    pub version: Option<String>,
    pub out: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub time: Option<f32>,
    width: Option<u32>,
    height: Option<u32>,
    data_root: Option<PathBuf>,
    game_dir: Option<PathBuf>,
    java: Option<String>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "item" => overrides.item = Some(PathBuf::from(value)),
                "version" => {
                    if value.is_empty() {
                        bail!("--version needs a non-empty value");
                    }
                    overrides.version = Some(value);
                }
                "out" => overrides.out = Some(PathBuf::from(value)),
                "config" => overrides.config = Some(PathBuf::from(value)),
                "time" => {
                    overrides.time = Some(value.parse::<f32>().with_context(|| format!("Invalid time '{value}'"))?);
                }
                "width" => {
                    overrides.width =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid width '{value}'"))?);
                }
                "height" => {
                    overrides.height =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid height '{value}'"))?);
                }
                "data-root" => overrides.data_root = Some(PathBuf::from(value)),
                "game-dir" => overrides.game_dir = Some(PathBuf::from(value)),
                "java" => overrides.java = Some(value),
                _ => bail!("Unknown flag '{flag}'. Supported flags: {SUPPORTED_FLAGS}."),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn output_path(&self) -> PathBuf {
        self.out.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH))
    }

    pub fn config_overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides {
            width: self.width,
            height: self.height,
            data_root: self.data_root.clone(),
            game_dir: self.game_dir.clone(),
            java: self.java.clone(),
        }
    }
}
