use tabpilot_core_types::{PlanStepId, TaskId};

use super::HistoryStore;
use crate::errors::AgentError;
use crate::model::{AgentRole, ConversationEntry};

/// The last `limit` entries one role gets to see on its next call.
#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    limit: usize,
}

impl ContextWindow {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn assemble(
        &self,
        store: &dyn HistoryStore,
        task: &TaskId,
        step: Option<&PlanStepId>,
        agent: AgentRole,
    ) -> Result<Vec<ConversationEntry>, AgentError> {
        let mut entries = store.entries_for(task, step, Some(agent)).await?;
        if entries.len() > self.limit {
            entries.drain(..entries.len() - self.limit);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistoryStore;
    use crate::model::ConversationRole;

    #[tokio::test]
    async fn keeps_the_most_recent_entries() {
        let store = InMemoryHistoryStore::new();
        let task = TaskId::new();
        for n in 0..5 {
            store
                .append(ConversationEntry::new(
                    ConversationRole::User,
                    AgentRole::Planner,
                    task.clone(),
                    None,
                    format!("turn {n}"),
                ))
                .await
                .unwrap();
        }

        let window = ContextWindow::new(2)
            .assemble(&store, &task, None, AgentRole::Planner)
            .await
            .unwrap();
        let contents: Vec<_> = window.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["turn 3", "turn 4"]);
    }
}
