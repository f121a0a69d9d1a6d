//! Agent Orchestrator: the plan, execute, evaluate loop with step and retry
//! budgets.

mod checkpoint;
mod config;
mod controller;
mod state;

pub use checkpoint::{CheckpointDecision, CheckpointHandler, ContinueOnCheckpoint};
pub use config::OrchestratorConfig;
pub use controller::{Orchestrator, MAX_RETRIES_EXCEEDED, MAX_STEPS_EXCEEDED, SESSION_RESET};
pub use state::{OrchestratorState, TaskOutcome};
