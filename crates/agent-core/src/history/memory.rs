use async_trait::async_trait;
use parking_lot::RwLock;
use tabpilot_core_types::{PlanStepId, TaskId};

use super::{sorted, HistoryStore};
use crate::errors::AgentError;
use crate::model::{AgentRole, ConversationEntry};

#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: RwLock<Vec<ConversationEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: ConversationEntry) -> Result<(), AgentError> {
        self.entries.write().push(entry);
        Ok(())
    }

    async fn entries_for(
        &self,
        task: &TaskId,
        step: Option<&PlanStepId>,
        agent: Option<AgentRole>,
    ) -> Result<Vec<ConversationEntry>, AgentError> {
        let scoped = self
            .entries
            .read()
            .iter()
            .filter(|entry| entry.in_scope(task, step, agent))
            .cloned()
            .collect();
        Ok(sorted(scoped))
    }

    async fn all(&self) -> Result<Vec<ConversationEntry>, AgentError> {
        Ok(sorted(self.entries.read().clone()))
    }

    async fn clear(&self) -> Result<(), AgentError> {
        self.entries.write().clear();
        Ok(())
    }
}
