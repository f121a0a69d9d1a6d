use crate::cli::context::CliContext;
use crate::config::TabpilotConfig;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value as JsonValue;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file and environment applied)
    Show,

    /// Get one configuration value by dotted key
    Get {
        /// Configuration key, e.g. `agent.max_retries`
        key: String,
    },

    /// Validate the configuration file
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => {
            let json = redacted(ctx.config())?;
            if !ctx.output().emit(&json)? {
                println!("Current configuration ({}):", path.display());
                print!("{}", serde_yaml::to_string(&json)?);
            }
        }
        ConfigAction::Get { key } => {
            let json = redacted(ctx.config())?;
            let segments = split_key(&key)?;
            let Some(value) = get_json_value(&json, &segments) else {
                bail!("{} not found in configuration", key);
            };
            if !ctx.output().emit(value)? {
                print!("{}", serde_yaml::to_string(value)?);
            }
        }
        ConfigAction::Validate => {
            if tokio::fs::try_exists(path).await? {
                TabpilotConfig::load(Some(path))
                    .with_context(|| format!("parsing {}", path.display()))?;
                println!("Configuration file {} is valid", path.display());
            } else {
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
            }
        }
    }

    Ok(())
}

fn redacted(config: &TabpilotConfig) -> Result<JsonValue> {
    let mut json = serde_json::to_value(config)?;
    if let Some(keys) = json.pointer_mut("/openai/api_keys").and_then(JsonValue::as_array_mut) {
        for key in keys.iter_mut() {
            *key = JsonValue::String(mask(key.as_str().unwrap_or_default()));
        }
    }
    if let Some(key) = json.pointer_mut("/gemini/api_key") {
        if let Some(raw) = key.as_str() {
            *key = JsonValue::String(mask(raw));
        }
    }
    Ok(json)
}

fn mask(secret: &str) -> String {
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{tail}")
    }
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments)
}

fn get_json_value<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in path {
        match current {
            JsonValue::Object(map) => {
                current = map.get(*segment)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_keys_resolve() {
        let json = redacted(&TabpilotConfig::default()).unwrap();
        let segments = split_key("agent.max_retries").unwrap();
        assert_eq!(get_json_value(&json, &segments), Some(&JsonValue::from(5)));
        assert!(get_json_value(&json, &["agent", "missing"]).is_none());
        assert!(split_key("..").is_err());
    }

    #[test]
    fn api_keys_are_masked() {
        let mut config = TabpilotConfig::default();
        config.openai.api_keys = vec!["sk-abcdef123456".to_string(), "abc".to_string()];
        config.gemini.api_key = Some("gm-secret-9876".to_string());
        let json = redacted(&config).unwrap();
        assert_eq!(json["openai"]["api_keys"][0], "****3456");
        assert_eq!(json["openai"]["api_keys"][1], "****");
        assert_eq!(json["gemini"]["api_key"], "****9876");
    }
}
