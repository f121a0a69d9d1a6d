use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::output::OutputFormat;
use crate::config::TabpilotConfig;

pub struct CliContext {
    config: Arc<TabpilotConfig>,
    config_path: PathBuf,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: TabpilotConfig, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
        }
    }

    pub fn config(&self) -> &TabpilotConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> &OutputFormat {
        &self.output
    }
}
