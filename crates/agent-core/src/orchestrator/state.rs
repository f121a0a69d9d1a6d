use std::fmt;

use serde::{Deserialize, Serialize};
use tabpilot_core_types::TaskId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Planning,
    ExecutingStep,
    EvaluatingStep,
    Retrying,
    Completed,
    Aborted,
}

impl OrchestratorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrchestratorState::Completed | OrchestratorState::Aborted)
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrchestratorState::Planning => "planning",
            OrchestratorState::ExecutingStep => "executing_step",
            OrchestratorState::EvaluatingStep => "evaluating_step",
            OrchestratorState::Retrying => "retrying",
            OrchestratorState::Completed => "completed",
            OrchestratorState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What a finished task reports back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps_completed: u32,
    pub retries: u32,
    /// Text of a `done` action, when one ended the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extracted: Vec<String>,
    pub state: OrchestratorState,
}
