pub mod import;
pub mod inspect;
pub mod scale;

use std::fmt::Display;

use anyhow::{Context, Result};
use popscale::ScaleConfig;
use serde_json::to_string_pretty;

use crate::cli::Cli;

/// Settings from `--config` (or defaults), with path flags applied on top.
pub(crate) fn load_config(cli: &Cli) -> Result<ScaleConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("[config] Failed to read {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("[config] Failed to parse {}", path.display()))?
        }
        None => ScaleConfig::default(),
    };

    if let Some(path) = &cli.definitions { config.definitions = path.clone() }
    if let Some(path) = &cli.data { config.data = path.clone() }
    if let Some(suffix) = &cli.backup_suffix { config.backup_suffix = suffix.clone() }
    tracing::debug!(?config, "resolved settings");
    Ok(config)
}

/// Print a summary to stdout, as JSON or as text.
pub(crate) fn emit<T: serde::Serialize + Display>(value: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", to_string_pretty(value).context("[output] Failed to serialize summary")?);
    } else {
        println!("{value}");
    }
    Ok(())
}
