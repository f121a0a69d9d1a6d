//! Sequential execution of one action batch over a page channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tabpilot_core_types::CycleId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::ActionError;
use crate::protocol::{PageChannel, PageRequest, PageResponse};
use crate::types::{ActionKind, ActionOutcome, AgentAction, ExecutorSettings, ScrollDirection};
use crate::waiting::{DefaultWaitStrategy, WaitStrategy};

/// Result of running one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub outcomes: Vec<ActionOutcome>,
    /// Set when a `done` action ended the task; carries its final text.
    pub terminated: Option<String>,
    /// Content returned by extract actions, in order.
    pub extracted: Vec<String>,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    pub fn first_error(&self) -> Option<&str> {
        self.outcomes.iter().find_map(|o| o.error.as_deref())
    }
}

pub struct BatchExecutor {
    wait: Arc<dyn WaitStrategy>,
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(&ExecutorSettings::default())
    }
}

impl BatchExecutor {
    pub fn new(settings: &ExecutorSettings) -> Self {
        Self::with_wait_strategy(Arc::new(DefaultWaitStrategy::from_settings(settings)))
    }

    pub fn with_wait_strategy(wait: Arc<dyn WaitStrategy>) -> Self {
        Self { wait }
    }

    /// Run `actions` in order against the page behind `channel`.
    ///
    /// Indices refer to the index map of `cycle`. The batch stops at the
    /// first failure, at `done`, or when `cancel` fires. The cycle is released
    /// once the batch is over.
    pub async fn execute(
        &self,
        channel: &dyn PageChannel,
        cycle: CycleId,
        actions: &[AgentAction],
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        let mut batch = BatchOutcome::default();

        for action in actions {
            if cancel.is_cancelled() {
                batch
                    .outcomes
                    .push(ActionOutcome::failed(action.kind.name(), "interrupted: batch cancelled"));
                break;
            }

            if let ActionKind::Done { text } = &action.kind {
                info!(cycle = %cycle, "done action received");
                batch.outcomes.push(ActionOutcome::ok("done"));
                batch.terminated = Some(text.clone().unwrap_or_default());
                break;
            }

            let name = action.kind.name();
            debug!(cycle = %cycle, action = name, description = %action.description, "executing action");
            match self.run_one(channel, cycle, &action.kind).await {
                Ok(content) => {
                    let mut outcome = ActionOutcome::ok(name);
                    if let Some(content) = content {
                        batch.extracted.push(content.clone());
                        outcome.content = Some(content);
                    }
                    batch.outcomes.push(outcome);
                }
                Err(err) => {
                    warn!(cycle = %cycle, action = name, %err, "action failed; stopping batch");
                    batch.outcomes.push(ActionOutcome::failed(name, err.to_string()));
                    break;
                }
            }

            if action.kind.changes_document() {
                self.wait.wait(channel).await;
            }
        }

        if let Err(err) = channel.send(PageRequest::ReleaseCycle { cycle }).await {
            debug!(cycle = %cycle, %err, "release cycle failed");
        }
        batch
    }

    async fn run_one(
        &self,
        channel: &dyn PageChannel,
        cycle: CycleId,
        kind: &ActionKind,
    ) -> Result<Option<String>, ActionError> {
        let request = request_for(cycle, kind)?;
        match channel.send(request).await? {
            PageResponse::Ack | PageResponse::Ready { .. } | PageResponse::State(_) => Ok(None),
            PageResponse::Content { content } => Ok(Some(content)),
            PageResponse::Failed { error, .. } => Err(ActionError::Execution(error)),
        }
    }
}

/// Page request carrying out `kind` against the index map of `cycle`.
pub fn request_for(cycle: CycleId, kind: &ActionKind) -> Result<PageRequest, ActionError> {
    Ok(match kind {
        ActionKind::Activate { index } => PageRequest::PerformActivate {
            cycle,
            index: *index,
        },
        ActionKind::SetValue { index, value } => PageRequest::PerformSetValue {
            cycle,
            index: *index,
            value: value.clone(),
        },
        ActionKind::Search { query } => PageRequest::PerformSearch {
            query: query.clone(),
        },
        ActionKind::Navigate { url } => PageRequest::NavigateToUrl { url: url.clone() },
        ActionKind::GoBack => PageRequest::NavigateBack,
        ActionKind::ScrollDown { amount } => PageRequest::Scroll {
            direction: ScrollDirection::Down,
            amount: *amount,
        },
        ActionKind::ScrollUp { amount } => PageRequest::Scroll {
            direction: ScrollDirection::Up,
            amount: *amount,
        },
        ActionKind::SendKeys { keys } => PageRequest::SendKeys { keys: keys.clone() },
        ActionKind::ExtractContent { format } => PageRequest::ExtractContent { format: *format },
        ActionKind::Done { .. } => {
            return Err(ActionError::Internal("done has no page request".to_string()))
        }
    })
}
