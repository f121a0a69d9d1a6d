use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabpilot_core_types::{EntryId, PlanStepId, TaskId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Completed,
    Failed,
}

/// One user request handled by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            description: description.into(),
            status: TaskStatus::InProgress,
            created_at: Utc::now(),
            error: None,
        }
    }

    pub fn complete(&mut self) {
        self.status = TaskStatus::Completed;
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(reason.into());
    }

    pub fn is_finished(&self) -> bool {
        self.status != TaskStatus::InProgress
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    #[default]
    Action,
    /// Stop and hand fresh state back for re-planning.
    Checkpoint,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanStep {
    pub id: PlanStepId,
    pub task_id: TaskId,
    pub description: String,
    pub kind: StepKind,
    pub success_criteria: String,
    pub confidence: f64,
    pub status: StepStatus,
}

impl PlanStep {
    pub fn new(task_id: TaskId, kind: StepKind, description: impl Into<String>) -> Self {
        Self {
            id: PlanStepId::new(),
            task_id,
            description: description.into(),
            kind,
            success_criteria: String::new(),
            confidence: 0.0,
            status: StepStatus::Pending,
        }
    }

    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.success_criteria = criteria.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Role of a conversation turn exchanged with the collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationRole {
    User,
    Assistant,
}

/// Mode the reasoning collaborator is asked to act in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Planner,
    Executor,
    Evaluator,
}

impl AgentRole {
    pub const ALL: [AgentRole; 3] = [AgentRole::Planner, AgentRole::Executor, AgentRole::Evaluator];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Executor => "executor",
            AgentRole::Evaluator => "evaluator",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of one collaborator exchange half.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationEntry {
    pub id: EntryId,
    pub role: ConversationRole,
    pub agent: AgentRole,
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_step_id: Option<PlanStepId>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn new(
        role: ConversationRole,
        agent: AgentRole,
        task_id: TaskId,
        plan_step_id: Option<PlanStepId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            role,
            agent,
            task_id,
            plan_step_id,
            content: content.into(),
            elements: None,
            screenshot: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_page(mut self, elements: Option<String>, screenshot: Option<String>) -> Self {
        self.elements = elements;
        self.screenshot = screenshot;
        self
    }

    /// Whether the entry falls inside a `{task, step?, agent?}` scope.
    pub fn in_scope(
        &self,
        task: &TaskId,
        step: Option<&PlanStepId>,
        agent: Option<AgentRole>,
    ) -> bool {
        &self.task_id == task
            && step.map_or(true, |step| self.plan_step_id.as_ref() == Some(step))
            && agent.map_or(true, |agent| self.agent == agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_filters_by_task_step_and_agent() {
        let task = TaskId::new();
        let step = PlanStepId::new();
        let entry = ConversationEntry::new(
            ConversationRole::User,
            AgentRole::Executor,
            task.clone(),
            Some(step.clone()),
            "click buy",
        );

        assert!(entry.in_scope(&task, None, None));
        assert!(entry.in_scope(&task, Some(&step), Some(AgentRole::Executor)));
        assert!(!entry.in_scope(&task, Some(&PlanStepId::new()), None));
        assert!(!entry.in_scope(&task, None, Some(AgentRole::Evaluator)));
        assert!(!entry.in_scope(&TaskId::new(), None, None));
    }

    #[test]
    fn task_lifecycle() {
        let mut task = Task::new("buy milk");
        assert!(!task.is_finished());
        task.fail("session reset");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("session reset"));
    }
}
