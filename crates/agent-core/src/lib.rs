//! Agent core for tabpilot.
//!
//! Holds the task and conversation models, the history store, the port to
//! the reasoning collaborator and the orchestrator that drives a page through
//! plan, execute and evaluate cycles.

pub mod errors;
pub mod history;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod reasoning;

pub use errors::AgentError;
pub use history::{ContextWindow, HistoryStore, InMemoryHistoryStore, JsonFileHistoryStore};
pub use model::{
    AgentRole, ConversationEntry, ConversationRole, PlanStep, StepKind, StepStatus, Task,
    TaskStatus,
};
pub use orchestrator::{
    CheckpointDecision, CheckpointHandler, ContinueOnCheckpoint, Orchestrator, OrchestratorConfig,
    OrchestratorState, TaskOutcome, MAX_RETRIES_EXCEEDED, MAX_STEPS_EXCEEDED, SESSION_RESET,
};
pub use reasoning::{
    extract_json_object, response_schema, Collaborator, Evaluation, EvaluatorReply, ExecutorReply,
    PlannerReply, ReasoningRequest, ReasoningService, ScriptedReasoner,
};
