use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

use super::{ReasoningRequest, ReasoningService};
use crate::errors::AgentError;
use crate::model::AgentRole;

/// Deterministic collaborator used for tests and offline runs.
///
/// Replays queued replies per role and records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    queues: Mutex<HashMap<AgentRole, VecDeque<String>>>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

#[derive(Debug, Default, Deserialize)]
struct Script {
    #[serde(default)]
    planner: Vec<Value>,
    #[serde(default)]
    executor: Vec<Value>,
    #[serde(default)]
    evaluator: Vec<Value>,
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{"planner": [...], "executor": [...], "evaluator": [...]}`.
    /// String items are replayed verbatim, anything else is re-encoded.
    pub fn from_script(raw: &str) -> Result<Self, AgentError> {
        let script: Script = serde_json::from_str(raw)
            .map_err(|err| AgentError::invalid_request(format!("invalid reply script: {err}")))?;
        let reasoner = Self::new();
        for (role, replies) in [
            (AgentRole::Planner, script.planner),
            (AgentRole::Executor, script.executor),
            (AgentRole::Evaluator, script.evaluator),
        ] {
            for reply in replies {
                match reply {
                    Value::String(text) => reasoner.push(role, text),
                    other => reasoner.push(role, other.to_string()),
                }
            }
        }
        Ok(reasoner)
    }

    pub fn push(&self, role: AgentRole, reply: impl Into<String>) {
        self.queues.lock().entry(role).or_default().push_back(reply.into());
    }

    pub fn push_json(&self, role: AgentRole, reply: Value) {
        self.push(role, reply.to_string());
    }

    pub fn remaining(&self, role: AgentRole) -> usize {
        self.queues.lock().get(&role).map_or(0, VecDeque::len)
    }

    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, role: AgentRole) -> Vec<ReasoningRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.role == role)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoner {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, AgentError> {
        self.requests.lock().push(request.clone());
        self.queues
            .lock()
            .get_mut(&request.role)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                AgentError::collaborator(format!("no scripted reply left for {}", request.role))
            })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
