//! Conversation history store.
//!
//! Entries are append-only. Readers scope them by task, plan step and agent
//! role so each collaborator role only sees its own traffic.

mod file;
mod memory;
mod window;

pub use file::JsonFileHistoryStore;
pub use memory::InMemoryHistoryStore;
pub use window::ContextWindow;

use async_trait::async_trait;
use tabpilot_core_types::{PlanStepId, TaskId};

use crate::errors::AgentError;
use crate::model::{AgentRole, ConversationEntry};

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, entry: ConversationEntry) -> Result<(), AgentError>;

    /// Entries of `task`, optionally narrowed to one step and one role,
    /// oldest first.
    async fn entries_for(
        &self,
        task: &TaskId,
        step: Option<&PlanStepId>,
        agent: Option<AgentRole>,
    ) -> Result<Vec<ConversationEntry>, AgentError>;

    /// Every entry, oldest first.
    async fn all(&self) -> Result<Vec<ConversationEntry>, AgentError>;

    async fn clear(&self) -> Result<(), AgentError>;
}

pub(crate) fn sorted(mut entries: Vec<ConversationEntry>) -> Vec<ConversationEntry> {
    entries.sort_by_key(|entry| entry.timestamp);
    entries
}
