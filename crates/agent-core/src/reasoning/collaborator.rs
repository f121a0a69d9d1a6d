use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::replies::parse_reply;
use super::{ReasoningRequest, ReasoningService};
use crate::errors::AgentError;

/// Wraps a [`ReasoningService`] with fixed-backoff retries over both
/// transport errors and replies that fail to parse.
#[derive(Clone)]
pub struct Collaborator {
    service: Arc<dyn ReasoningService>,
    attempts: u32,
    backoff: Duration,
}

impl Collaborator {
    pub fn new(service: Arc<dyn ReasoningService>, attempts: u32, backoff: Duration) -> Self {
        Self {
            service,
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn service(&self) -> &Arc<dyn ReasoningService> {
        &self.service
    }

    /// Ask and parse. Returns the parsed reply along with the raw text so it
    /// can be recorded in history.
    pub async fn ask<T>(&self, request: &ReasoningRequest) -> Result<(T, String), AgentError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut last_error = AgentError::collaborator("no attempt made");
        for attempt in 1..=self.attempts {
            let result = match self.service.complete(request).await {
                Ok(raw) => parse_reply::<T>(request.role, &raw).map(|reply| (reply, raw)),
                Err(err) => Err(err),
            };
            match result {
                Ok(reply) => {
                    debug!(role = %request.role, attempt, "collaborator replied");
                    return Ok(reply);
                }
                Err(err) => {
                    warn!(
                        service = self.service.name(),
                        role = %request.role,
                        attempt,
                        error = %err,
                        "collaborator request failed"
                    );
                    last_error = err;
                    if attempt < self.attempts && !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AgentRole;
    use crate::reasoning::{EvaluatorReply, ScriptedReasoner};

    #[tokio::test]
    async fn retries_until_a_reply_parses() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        reasoner.push(AgentRole::Evaluator, "not json");
        reasoner.push(AgentRole::Evaluator, r#"{"evaluation":"success","reason":"ok"}"#);
        let collaborator = Collaborator::new(reasoner.clone(), 3, Duration::ZERO);

        let request = ReasoningRequest::new(AgentRole::Evaluator, "sys", "check");
        let (reply, _) = collaborator.ask::<EvaluatorReply>(&request).await.unwrap();
        assert!(reply.is_success());
        assert_eq!(reasoner.requests().len(), 2);
    }

    #[tokio::test]
    async fn surfaces_the_last_error() {
        let reasoner = Arc::new(ScriptedReasoner::new());
        let collaborator = Collaborator::new(reasoner.clone(), 2, Duration::ZERO);
        let request = ReasoningRequest::new(AgentRole::Planner, "sys", "plan");
        let err = collaborator.ask::<EvaluatorReply>(&request).await.unwrap_err();
        assert_eq!(err, AgentError::collaborator("no scripted reply left for planner"));
        assert_eq!(reasoner.requests().len(), 2);
    }
}
