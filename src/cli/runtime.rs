use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::TabpilotConfig;

pub fn load_local_env_overrides() {
    let path = Path::new("config/local.env");
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (idx, raw_line) in contents.lines().enumerate() {
                let line = raw_line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    warn!(line = idx + 1, "invalid local.env entry; skipping");
                    continue;
                };
                let key = key.trim();
                if key.is_empty() || env::var(key).is_ok() {
                    continue;
                }
                env::set_var(key, unescape_value(value.trim()));
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

/// Logs go to stderr so `--output json` stays machine readable.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: TabpilotConfig,
    pub path: PathBuf,
}

pub fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    if config_path.exists() {
        info!("Loading configuration from: {}", config_path.display());
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
    }
    let config = TabpilotConfig::load(Some(&config_path)).context("Failed to load config")?;
    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}

// Priority: ./config/config.yaml > ~/.config/tabpilot/config.yaml
fn default_config_path() -> Result<PathBuf> {
    let local_config = PathBuf::from("config/config.yaml");
    if local_config.exists() {
        return Ok(local_config);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("tabpilot");
    path.push("config.yaml");
    Ok(path)
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_values_are_unescaped() {
        assert_eq!(unescape_value("\"a\\nb\""), "a\nb");
        assert_eq!(unescape_value("plain"), "plain");
    }
}
