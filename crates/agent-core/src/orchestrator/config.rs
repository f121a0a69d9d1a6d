use std::path::PathBuf;
use std::time::Duration;

use action_primitives::ExecutorSettings;
use serde::{Deserialize, Serialize};

use crate::prompts::DEFAULT_SYSTEM_PROMPT;

/// Budgets and knobs for one orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Successful plan steps allowed before the task is aborted.
    pub max_steps: u32,
    /// Failed attempts allowed over the whole task.
    pub max_retries: u32,
    pub collaborator_attempts: u32,
    pub collaborator_backoff_ms: u64,
    /// History entries handed to a role per call.
    pub context_window: usize,
    /// Attach a viewport capture to each request.
    pub vision: bool,
    pub system_prompt: Option<String>,
    /// When set, every captured screenshot is written here.
    pub screenshot_dir: Option<PathBuf>,
    pub executor: ExecutorSettings,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            max_retries: 5,
            collaborator_attempts: 3,
            collaborator_backoff_ms: 1000,
            context_window: 10,
            vision: true,
            system_prompt: None,
            screenshot_dir: None,
            executor: ExecutorSettings::default(),
        }
    }
}

impl OrchestratorConfig {
    /// No delays anywhere; fixture runs and tests.
    pub fn minimal() -> Self {
        Self {
            collaborator_backoff_ms: 0,
            executor: ExecutorSettings::minimal(),
            ..Self::default()
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_vision(mut self, vision: bool) -> Self {
        self.vision = vision;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    pub fn with_executor(mut self, executor: ExecutorSettings) -> Self {
        self.executor = executor;
        self
    }

    pub fn collaborator_backoff(&self) -> Duration {
        Duration::from_millis(self.collaborator_backoff_ms)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}
