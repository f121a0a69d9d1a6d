//! Layered configuration: built-in defaults, a YAML file, then `TABPILOT_*`
//! environment variables.

use std::path::{Path, PathBuf};

use action_primitives::ExecutorSettings;
use agent_core::OrchestratorConfig;
use extensions_bridge::BridgeConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PREFIX: &str = "TABPILOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Openai,
    Gemini,
    /// Replays a reply script; no network.
    Scripted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// Rotated in order when a key is rate limited.
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash-exp".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.4,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_steps: u32,
    pub max_retries: u32,
    pub collaborator_attempts: u32,
    pub collaborator_backoff_ms: u64,
    pub context_window: usize,
    pub vision: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            max_steps: defaults.max_steps,
            max_retries: defaults.max_retries,
            collaborator_attempts: defaults.collaborator_attempts,
            collaborator_backoff_ms: defaults.collaborator_backoff_ms,
            context_window: defaults.context_window,
            vision: defaults.vision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabpilotConfig {
    pub provider: Provider,
    pub openai: OpenAiSettings,
    pub gemini: GeminiSettings,
    pub agent: AgentSettings,
    pub executor: ExecutorSettings,
    pub bridge: BridgeConfig,
    /// Write every captured screenshot to `output_dir`.
    pub debug_mode: bool,
    pub output_dir: PathBuf,
    pub system_prompt: Option<String>,
    /// JSON file for conversation history; in-memory when unset.
    pub history_path: Option<PathBuf>,
}

impl Default for TabpilotConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            openai: OpenAiSettings::default(),
            gemini: GeminiSettings::default(),
            agent: AgentSettings::default(),
            executor: ExecutorSettings::default(),
            bridge: BridgeConfig::default(),
            debug_mode: false,
            output_dir: PathBuf::from("output"),
            system_prompt: None,
            history_path: None,
        }
    }
}

impl TabpilotConfig {
    /// Defaults, then `file` when it exists, then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("openai.api_keys"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_steps: self.agent.max_steps,
            max_retries: self.agent.max_retries,
            collaborator_attempts: self.agent.collaborator_attempts,
            collaborator_backoff_ms: self.agent.collaborator_backoff_ms,
            context_window: self.agent.context_window,
            vision: self.agent.vision,
            system_prompt: self.system_prompt.clone(),
            screenshot_dir: self
                .debug_mode
                .then(|| self.output_dir.join("screenshots")),
            executor: self.executor.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "provider: gemini\nagent:\n  max_retries: 2\nexecutor:\n  settle_delay_ms: 0\n",
        )
        .unwrap();

        let config = TabpilotConfig::load(Some(&path)).unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.agent.max_retries, 2);
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.executor.settle_delay_ms, 0);
        assert_eq!(config.executor.readiness_timeout_ms, 5000);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.bridge.attempts, 3);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = TabpilotConfig::load(Some(Path::new("/nonexistent/tabpilot.yaml"))).unwrap();
        assert_eq!(config.gemini.top_k, 40);
        assert_eq!(config.orchestrator().max_retries, 5);
        assert!(config.orchestrator().screenshot_dir.is_none());
    }
}
