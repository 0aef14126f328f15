use crate::config::{Theme, ViewerConfigOverrides, DEFAULT_CONFIG_PATH};
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOverrides {
    width: Option<u32>,
    height: Option<u32>,
    vsync: Option<bool>,
    theme: Option<Theme>,
    pub config_path: PathBuf,
    /// Files queued for import at startup, in the order given.
    pub open: Vec<PathBuf>,
}

impl Default for CliOverrides {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            vsync: None,
            theme: None,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            open: Vec::new(),
        }
    }
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
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Use --open <file> to load a model.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "width" => {
                    overrides.width =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid width '{value}'"))?);
                }
                "height" => {
                    overrides.height =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid height '{value}'"))?);
                }
                "vsync" => {
                    overrides.vsync = Some(parse_bool_flag("vsync", &value)?);
                }
                "theme" => {
                    overrides.theme = Some(parse_theme(&value)?);
                }
                "config" => {
                    overrides.config_path = PathBuf::from(value);
                }
                "open" => {
                    overrides.open.push(PathBuf::from(value));
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --width, --height, --vsync, --theme, --config, --open."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_overrides(&self) -> ViewerConfigOverrides {
        ViewerConfigOverrides { width: self.width, height: self.height, vsync: self.vsync, theme: self.theme }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}

fn parse_theme(value: &str) -> Result<Theme> {
    match value.to_ascii_lowercase().as_str() {
        "light" => Ok(Theme::Light),
        "dark" => Ok(Theme::Dark),
        other => bail!("Invalid theme '{other}'. Use light or dark."),
    }
}
