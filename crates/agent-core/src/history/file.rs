use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tabpilot_core_types::{PlanStepId, TaskId};
use tokio::sync::Mutex;
use tracing::debug;

use super::{sorted, HistoryStore};
use crate::errors::AgentError;
use crate::model::{AgentRole, ConversationEntry};

/// History kept as one JSON array on disk.
#[derive(Debug)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<ConversationEntry>, AgentError> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(raw) => serde_json::from_slice(&raw).map_err(|err| {
                AgentError::history(format!("corrupt history file {}: {err}", self.path.display()))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(AgentError::history(format!(
                "failed to read {}: {err}",
                self.path.display()
            ))),
        }
    }

    async fn store(&self, entries: &[ConversationEntry]) -> Result<(), AgentError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| AgentError::history(format!("failed to create {}: {err}", parent.display())))?;
        }
        let raw = serde_json::to_vec_pretty(entries)
            .map_err(|err| AgentError::history(format!("failed to encode history: {err}")))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|err| AgentError::history(format!("failed to write {}: {err}", self.path.display())))
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn append(&self, entry: ConversationEntry) -> Result<(), AgentError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.push(entry);
        self.store(&entries).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "history appended");
        Ok(())
    }

    async fn entries_for(
        &self,
        task: &TaskId,
        step: Option<&PlanStepId>,
        agent: Option<AgentRole>,
    ) -> Result<Vec<ConversationEntry>, AgentError> {
        let _guard = self.lock.lock().await;
        let entries = self.load().await?;
        Ok(sorted(
            entries
                .into_iter()
                .filter(|entry| entry.in_scope(task, step, agent))
                .collect(),
        ))
    }

    async fn all(&self) -> Result<Vec<ConversationEntry>, AgentError> {
        let _guard = self.lock.lock().await;
        Ok(sorted(self.load().await?))
    }

    async fn clear(&self) -> Result<(), AgentError> {
        let _guard = self.lock.lock().await;
        self.store(&[]).await
    }
}
