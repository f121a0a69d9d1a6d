//! Reasoning service backends selectable from configuration.

mod gemini;
mod openai;

use std::path::Path;
use std::sync::Arc;

use agent_core::{ReasoningService, ScriptedReasoner};
use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::{Provider, TabpilotConfig};

pub use gemini::GeminiReasoner;
pub use openai::OpenAiReasoner;

/// A reply script always wins over the configured provider.
pub fn build_reasoner(
    config: &TabpilotConfig,
    replies: Option<&Path>,
) -> Result<Arc<dyn ReasoningService>> {
    if let Some(path) = replies {
        return scripted(path);
    }
    let service: Arc<dyn ReasoningService> = match config.provider {
        Provider::Openai => Arc::new(OpenAiReasoner::new(config.openai.clone())?),
        Provider::Gemini => Arc::new(GeminiReasoner::new(config.gemini.clone())?),
        Provider::Scripted => bail!("the scripted provider needs --replies <file>"),
    };
    info!(provider = service.name(), "reasoning service ready");
    Ok(service)
}

fn scripted(path: &Path) -> Result<Arc<dyn ReasoningService>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read reply script {}", path.display()))?;
    let reasoner = ScriptedReasoner::from_script(&raw)
        .with_context(|| format!("invalid reply script {}", path.display()))?;
    info!(script = %path.display(), "replaying scripted replies");
    Ok(Arc::new(reasoner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_provider_requires_replies() {
        let config = TabpilotConfig {
            provider: Provider::Scripted,
            ..TabpilotConfig::default()
        };
        let err = build_reasoner(&config, None).err().unwrap();
        assert!(err.to_string().contains("--replies"));
    }

    #[test]
    fn reply_script_overrides_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replies.json");
        std::fs::write(&path, r#"{"planner": [], "executor": [], "evaluator": []}"#).unwrap();

        let service = build_reasoner(&TabpilotConfig::default(), Some(&path)).unwrap();
        assert_eq!(service.name(), "scripted");
    }

    #[test]
    fn openai_without_keys_is_rejected() {
        assert!(build_reasoner(&TabpilotConfig::default(), None).is_err());
    }
}
