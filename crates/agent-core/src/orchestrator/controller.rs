//! Plan, execute, evaluate.
//!
//! One task runs at a time. Each step asks the executor role for an action
//! batch against freshly indexed state, runs it, then asks the evaluator role
//! for a verdict against the state the batch left behind. Failed verdicts
//! retry the same step until the task-wide retry budget runs out.

use std::sync::Arc;

use action_primitives::{
    AgentAction, BatchExecutor, BatchOutcome, PageChannel, PageRequest, PageResponse, PageState,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use serde::Deserialize;
use tabpilot_core_types::CycleId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::checkpoint::{CheckpointDecision, CheckpointHandler, ContinueOnCheckpoint};
use super::config::OrchestratorConfig;
use super::state::{OrchestratorState, TaskOutcome};
use crate::errors::AgentError;
use crate::history::{ContextWindow, HistoryStore};
use crate::model::{
    AgentRole, ConversationEntry, ConversationRole, PlanStep, StepKind, StepStatus, Task,
};
use crate::prompts::{evaluator_prompt, executor_prompt, planner_prompt, replan_prompt};
use crate::reasoning::{
    Collaborator, EvaluatorReply, ExecutorReply, PlannerReply, ReasoningRequest, ReasoningService,
};

pub const MAX_RETRIES_EXCEEDED: &str = "Max retries exceeded";
pub const MAX_STEPS_EXCEEDED: &str = "Max steps exceeded";
pub const SESSION_RESET: &str = "session reset";

/// Why a task stopped before completing.
enum Halt {
    Reset,
    Abort(String),
}

impl From<AgentError> for Halt {
    fn from(err: AgentError) -> Self {
        Halt::Abort(err.to_string())
    }
}

enum StepVerdict {
    Passed,
    Failed(StepFailure),
    /// A `done` action ended the task.
    Done,
}

/// What the next attempt at a failed step gets told.
#[derive(Debug, Clone)]
struct StepFailure {
    reason: String,
    actions: String,
}

impl StepFailure {
    fn new(reason: impl Into<String>, actions: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            actions: actions.into(),
        }
    }
}

#[derive(Debug)]
struct Progress {
    state: OrchestratorState,
    steps: u32,
    retries: u32,
    final_text: Option<String>,
    extracted: Vec<String>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            state: OrchestratorState::Planning,
            steps: 0,
            retries: 0,
            final_text: None,
            extracted: Vec::new(),
        }
    }
}

struct ActiveTask {
    task: Task,
    cancel: CancellationToken,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    collaborator: Collaborator,
    history: Arc<dyn HistoryStore>,
    window: ContextWindow,
    executor: BatchExecutor,
    checkpoints: Arc<dyn CheckpointHandler>,
    active: Mutex<Option<ActiveTask>>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        service: Arc<dyn ReasoningService>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let collaborator = Collaborator::new(
            service,
            config.collaborator_attempts,
            config.collaborator_backoff(),
        );
        Self {
            window: ContextWindow::new(config.context_window),
            executor: BatchExecutor::new(&config.executor),
            collaborator,
            history,
            checkpoints: Arc::new(ContinueOnCheckpoint),
            active: Mutex::new(None),
            config,
        }
    }

    pub fn with_checkpoint_handler(mut self, handler: Arc<dyn CheckpointHandler>) -> Self {
        self.checkpoints = handler;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// The most recent task, finished or not.
    pub fn current_task(&self) -> Option<Task> {
        self.active.lock().as_ref().map(|active| active.task.clone())
    }

    /// Run `description` to completion against the page behind `channel`.
    ///
    /// Never fails: every error ends up in the returned outcome.
    pub async fn run(&self, channel: &dyn PageChannel, description: &str) -> TaskOutcome {
        let task = Task::new(description);
        let cancel = CancellationToken::new();
        {
            let mut active = self.active.lock();
            if let Some(previous) = active.take() {
                previous.cancel.cancel();
            }
            *active = Some(ActiveTask {
                task: task.clone(),
                cancel: cancel.clone(),
            });
        }
        info!(task = %task.id, description, "task started");

        let mut progress = Progress::default();
        let result = if description.trim().is_empty() {
            Err(Halt::Abort("task description is empty".to_string()))
        } else {
            self.drive(channel, &task, &cancel, &mut progress).await
        };

        let error = match result {
            Ok(()) => {
                progress.state = OrchestratorState::Completed;
                info!(
                    task = %task.id,
                    steps = progress.steps,
                    retries = progress.retries,
                    "task completed"
                );
                None
            }
            Err(Halt::Reset) => {
                progress.state = OrchestratorState::Aborted;
                info!(task = %task.id, "task abandoned after session reset");
                Some(SESSION_RESET.to_string())
            }
            Err(Halt::Abort(reason)) => {
                progress.state = OrchestratorState::Aborted;
                warn!(task = %task.id, reason = %reason, "task aborted");
                Some(reason)
            }
        };

        if let Some(active) = self
            .active
            .lock()
            .as_mut()
            .filter(|active| active.task.id == task.id && !active.task.is_finished())
        {
            match &error {
                None => active.task.complete(),
                Some(reason) => active.task.fail(reason.clone()),
            }
        }

        TaskOutcome {
            task_id: task.id,
            success: error.is_none(),
            error,
            steps_completed: progress.steps,
            retries: progress.retries,
            final_text: progress.final_text,
            extracted: progress.extracted,
            state: progress.state,
        }
    }

    /// Abandon the running task, clear the conversation and ask the page to
    /// drop overlays and its index.
    pub async fn reset(&self, channel: &dyn PageChannel) -> Result<(), AgentError> {
        let abandoned = self.active.lock().as_mut().map(|active| {
            active.cancel.cancel();
            if !active.task.is_finished() {
                active.task.fail(SESSION_RESET);
            }
            active.task.id.clone()
        });
        info!(task = ?abandoned.as_ref().map(|id| id.to_string()), "session reset");

        self.history.clear().await?;
        match channel.send(PageRequest::Cleanup).await {
            Ok(PageResponse::Failed { error, .. }) => Err(AgentError::Page(error)),
            Ok(_) => Ok(()),
            Err(err) => Err(AgentError::Page(err.to_string())),
        }
    }

    async fn drive(
        &self,
        channel: &dyn PageChannel,
        task: &Task,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<(), Halt> {
        let page = self.page_state(channel, task, cancel).await?;
        let mut plan = self.plan(task, &[], &page, cancel).await?;
        self.release(channel, page.cycle).await;
        if plan.is_empty() {
            return Err(Halt::Abort("planner returned an empty plan".to_string()));
        }

        let mut index = 0;
        let mut last_failure: Option<StepFailure> = None;
        while index < plan.len() {
            ensure_active(cancel)?;

            if plan[index].kind == StepKind::Checkpoint {
                let page = self.page_state(channel, task, cancel).await?;
                let decision = self.checkpoints.on_checkpoint(task, &plan[index], &page).await;
                self.release(channel, page.cycle).await;
                plan[index].status = StepStatus::Completed;
                match decision {
                    CheckpointDecision::Continue => index += 1,
                    CheckpointDecision::Replan => {
                        progress.steps += 1;
                        if progress.steps >= self.config.max_steps {
                            return Err(Halt::Abort(MAX_STEPS_EXCEEDED.to_string()));
                        }
                        progress.state = OrchestratorState::Planning;
                        let done: Vec<PlanStep> = plan[..=index]
                            .iter()
                            .filter(|step| step.status == StepStatus::Completed)
                            .cloned()
                            .collect();
                        let page = self.page_state(channel, task, cancel).await?;
                        let fresh = self.plan(task, &done, &page, cancel).await?;
                        self.release(channel, page.cycle).await;
                        plan.truncate(index + 1);
                        plan.extend(fresh);
                        index += 1;
                    }
                    CheckpointDecision::Abort => {
                        return Err(Halt::Abort(format!(
                            "aborted at checkpoint: {}",
                            plan[index].description
                        )));
                    }
                }
                continue;
            }

            plan[index].status = StepStatus::InProgress;
            let verdict = self
                .attempt_step(
                    channel,
                    task,
                    &plan[index],
                    last_failure.as_ref(),
                    cancel,
                    progress,
                )
                .await?;
            match verdict {
                StepVerdict::Done => {
                    plan[index].status = StepStatus::Completed;
                    progress.steps += 1;
                    return Ok(());
                }
                StepVerdict::Passed => {
                    last_failure = None;
                    plan[index].status = StepStatus::Completed;
                    progress.steps += 1;
                    index += 1;
                    info!(task = %task.id, steps = progress.steps, "step passed");
                    if index < plan.len() && progress.steps >= self.config.max_steps {
                        return Err(Halt::Abort(MAX_STEPS_EXCEEDED.to_string()));
                    }
                }
                StepVerdict::Failed(failure) => {
                    progress.state = OrchestratorState::Retrying;
                    progress.retries += 1;
                    warn!(
                        task = %task.id,
                        step = %plan[index].id,
                        retries = progress.retries,
                        reason = %failure.reason,
                        "step failed"
                    );
                    if progress.retries >= self.config.max_retries {
                        plan[index].status = StepStatus::Failed;
                        return Err(Halt::Abort(MAX_RETRIES_EXCEEDED.to_string()));
                    }
                    last_failure = Some(failure);
                }
            }
        }
        Ok(())
    }

    async fn plan(
        &self,
        task: &Task,
        done: &[PlanStep],
        page: &PageState,
        cancel: &CancellationToken,
    ) -> Result<Vec<PlanStep>, Halt> {
        let prompt = if done.is_empty() {
            planner_prompt(&task.description)
        } else {
            replan_prompt(&task.description, done)
        };
        let reply: PlannerReply = self
            .consult(AgentRole::Planner, task, None, prompt, page, cancel)
            .await?;
        let steps: Vec<PlanStep> = reply
            .action_plan
            .into_iter()
            .map(|planned| {
                PlanStep::new(task.id.clone(), planned.kind, planned.description)
                    .with_criteria(planned.success_criteria)
                    .with_confidence(planned.confidence_level)
            })
            .collect();
        info!(task = %task.id, steps = steps.len(), "plan received");
        Ok(steps)
    }

    async fn attempt_step(
        &self,
        channel: &dyn PageChannel,
        task: &Task,
        step: &PlanStep,
        previous: Option<&StepFailure>,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<StepVerdict, Halt> {
        progress.state = OrchestratorState::ExecutingStep;
        let page = self.page_state(channel, task, cancel).await?;
        let reply: ExecutorReply = self
            .consult(
                AgentRole::Executor,
                task,
                Some(step),
                executor_prompt(
                    &task.description,
                    step,
                    previous.map(|failure| (failure.reason.as_str(), failure.actions.as_str())),
                ),
                &page,
                cancel,
            )
            .await?;
        debug!(
            previous = %reply.current_state.evaluation_previous_goal,
            next_goal = ?reply.current_state.next_goal,
            "executor state"
        );

        let actions = match AgentAction::parse_batch(&reply.actions) {
            Ok(actions) => actions,
            Err(err) => {
                self.release(channel, page.cycle).await;
                return Ok(StepVerdict::Failed(StepFailure::new(err.to_string(), "")));
            }
        };
        let batch = self.executor.execute(channel, page.cycle, &actions, cancel).await;
        ensure_active(cancel)?;
        progress.extracted.extend(batch.extracted.iter().cloned());
        if let Some(text) = batch.terminated.clone() {
            info!(task = %task.id, "task marked done by executor");
            progress.final_text = Some(text);
            return Ok(StepVerdict::Done);
        }

        progress.state = OrchestratorState::EvaluatingStep;
        let summary = summarize(&batch);
        let page = self.page_state(channel, task, cancel).await?;
        let verdict: EvaluatorReply = self
            .consult(
                AgentRole::Evaluator,
                task,
                Some(step),
                evaluator_prompt(step, &summary),
                &page,
                cancel,
            )
            .await?;
        self.release(channel, page.cycle).await;

        if verdict.is_success() {
            return Ok(StepVerdict::Passed);
        }
        let reason = if verdict.reason.is_empty() {
            format!("evaluation {:?}", verdict.evaluation)
        } else {
            verdict.reason
        };
        Ok(StepVerdict::Failed(StepFailure::new(reason, summary)))
    }

    /// One collaborator exchange, recorded in history under `role`.
    async fn consult<T>(
        &self,
        role: AgentRole,
        task: &Task,
        step: Option<&PlanStep>,
        prompt: String,
        page: &PageState,
        cancel: &CancellationToken,
    ) -> Result<T, Halt>
    where
        T: for<'de> Deserialize<'de>,
    {
        let step_id = step.map(|step| &step.id);
        let history = self
            .window
            .assemble(self.history.as_ref(), &task.id, step_id, role)
            .await?;
        let screenshot = if self.config.vision {
            page.screenshot.clone()
        } else {
            None
        };
        let elements = Some(page.element_list.clone());
        let request = ReasoningRequest::new(role, self.config.system_prompt(), prompt.clone())
            .with_history(history)
            .with_page(elements.clone(), screenshot.clone());

        self.history
            .append(
                ConversationEntry::new(
                    ConversationRole::User,
                    role,
                    task.id.clone(),
                    step_id.cloned(),
                    prompt,
                )
                .with_page(elements, screenshot),
            )
            .await?;

        let (reply, raw) = tokio::select! {
            _ = cancel.cancelled() => return Err(Halt::Reset),
            result = self.collaborator.ask::<T>(&request) => result?,
        };
        ensure_active(cancel)?;

        self.history
            .append(ConversationEntry::new(
                ConversationRole::Assistant,
                role,
                task.id.clone(),
                step_id.cloned(),
                raw,
            ))
            .await?;
        Ok(reply)
    }

    async fn page_state(
        &self,
        channel: &dyn PageChannel,
        task: &Task,
        cancel: &CancellationToken,
    ) -> Result<PageState, Halt> {
        ensure_active(cancel)?;
        let request = PageRequest::GetPageState {
            capture_screenshot: self.config.vision || self.config.screenshot_dir.is_some(),
        };
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Halt::Reset),
            response = channel.send(request) => response,
        };
        let state = match response {
            Ok(PageResponse::State(state)) => state,
            Ok(PageResponse::Failed { error, .. }) => return Err(AgentError::Page(error).into()),
            Ok(other) => {
                return Err(AgentError::Page(format!(
                    "unexpected reply to get_page_state: {other:?}"
                ))
                .into())
            }
            Err(err) => return Err(AgentError::Page(err.to_string()).into()),
        };
        debug!(
            task = %task.id,
            cycle = %state.cycle,
            elements = state.element_count,
            "page state captured"
        );
        self.save_screenshot(task, &state).await;
        Ok(state)
    }

    async fn save_screenshot(&self, task: &Task, state: &PageState) {
        let (Some(dir), Some(encoded)) = (&self.config.screenshot_dir, &state.screenshot) else {
            return;
        };
        let bytes = match STANDARD.decode(encoded) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(cycle = %state.cycle, error = %err, "screenshot is not valid base64");
                return;
            }
        };
        let path = dir.join(format!("{}-{}.png", task.id, state.cycle));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, bytes).await
        }
        .await;
        match written {
            Ok(()) => debug!(path = %path.display(), "screenshot saved"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to save screenshot"),
        }
    }

    async fn release(&self, channel: &dyn PageChannel, cycle: CycleId) {
        if let Err(err) = channel.send(PageRequest::ReleaseCycle { cycle }).await {
            debug!(cycle = %cycle, error = %err, "release failed");
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), Halt> {
    if cancel.is_cancelled() {
        return Err(Halt::Reset);
    }
    Ok(())
}

fn summarize(batch: &BatchOutcome) -> String {
    batch
        .outcomes
        .iter()
        .map(|outcome| match &outcome.error {
            Some(error) => format!("{} failed ({error})", outcome.action),
            None => format!("{} ok", outcome.action),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
