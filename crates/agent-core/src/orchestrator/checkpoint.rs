use action_primitives::PageState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{PlanStep, Task};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointDecision {
    /// Move on to the next planned step.
    Continue,
    /// Ask the planner for new steps from the current page.
    Replan,
    Abort,
}

/// Decides what a checkpoint step does with the fresh page state.
#[async_trait]
pub trait CheckpointHandler: Send + Sync {
    async fn on_checkpoint(&self, task: &Task, step: &PlanStep, page: &PageState)
        -> CheckpointDecision;
}

/// Records the checkpoint and keeps going.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContinueOnCheckpoint;

#[async_trait]
impl CheckpointHandler for ContinueOnCheckpoint {
    async fn on_checkpoint(
        &self,
        task: &Task,
        step: &PlanStep,
        page: &PageState,
    ) -> CheckpointDecision {
        info!(
            task = %task.id,
            step = %step.id,
            cycle = %page.cycle,
            elements = page.element_count,
            "checkpoint reached"
        );
        CheckpointDecision::Continue
    }
}
