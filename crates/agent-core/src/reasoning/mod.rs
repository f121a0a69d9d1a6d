//! Port to the reasoning collaborator.
//!
//! The orchestrator talks to one [`ReasoningService`] in three roles. Each
//! role has its own reply schema (see [`replies`]); vendor clients turn the
//! schema into whatever structured-output mechanism they offer.

mod collaborator;
pub mod replies;
mod scripted;

pub use collaborator::Collaborator;
pub use replies::{
    extract_json_object, response_schema, CurrentState, Evaluation, EvaluatorReply,
    ExecutorReply, PlannedStep, PlannerReply,
};
pub use scripted::ScriptedReasoner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AgentError;
use crate::model::{AgentRole, ConversationEntry};

/// One call to the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasoningRequest {
    pub role: AgentRole,
    pub system_prompt: String,
    /// Prior turns of the same role and scope, oldest first.
    pub history: Vec<ConversationEntry>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<String>,
    /// Base64 PNG/JPEG of the viewport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl ReasoningRequest {
    pub fn new(role: AgentRole, system_prompt: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            role,
            system_prompt: system_prompt.into(),
            history: Vec::new(),
            prompt: prompt.into(),
            elements: None,
            screenshot: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn with_page(mut self, elements: Option<String>, screenshot: Option<String>) -> Self {
        self.elements = elements;
        self.screenshot = screenshot;
        self
    }

    /// JSON schema the reply must satisfy.
    pub fn schema(&self) -> Value {
        response_schema(self.role)
    }
}

/// A model vendor (or a test double) that answers [`ReasoningRequest`]s with
/// raw JSON text.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, AgentError>;

    fn name(&self) -> &str {
        "reasoning"
    }
}
