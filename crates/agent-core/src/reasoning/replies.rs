//! Reply shapes for the three collaborator roles.

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AgentError;
use crate::model::{AgentRole, StepKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PlannerReply {
    pub action_plan: Vec<PlannedStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PlannedStep {
    #[serde(rename = "type", default)]
    pub kind: StepKind,
    pub description: String,
    #[serde(default)]
    pub success_criteria: String,
    #[serde(default)]
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ExecutorReply {
    pub current_state: CurrentState,
    /// Kept raw so one bad entry is reported as an action error rather than
    /// a malformed reply.
    #[schemars(with = "Vec<ActionSpec>")]
    pub actions: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CurrentState {
    /// Success, Failed or Unknown, with a short reason.
    #[serde(default)]
    pub evaluation_previous_goal: String,
    /// What has been done and what must be remembered until the end of the task.
    #[serde(default)]
    pub memory: String,
    /// Only present when another goal remains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_goal: Option<String>,
}

/// Schema-only view of one executor action.
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ActionSpec {
    /// click, fill, search_google, go_to_url, go_back, scroll_down, scroll_up,
    /// send_keys, extract_content or done.
    action: ActionName,
    /// What this action will do.
    description: String,
    /// Element index (click and fill).
    index: Option<u64>,
    /// Text to fill.
    value: Option<String>,
    /// Search query.
    query: Option<String>,
    url: Option<String>,
    /// Scroll amount in pixels.
    amount: Option<f64>,
    keys: Option<String>,
    format: Option<ExtractFormatName>,
    /// Final answer for `done`.
    text: Option<String>,
}

#[allow(dead_code)]
#[derive(JsonSchema)]
#[serde(rename_all = "snake_case")]
enum ActionName {
    Click,
    Fill,
    SearchGoogle,
    GoToUrl,
    GoBack,
    ScrollDown,
    ScrollUp,
    SendKeys,
    ExtractContent,
    Done,
}

#[allow(dead_code)]
#[derive(JsonSchema)]
#[serde(rename_all = "snake_case")]
enum ExtractFormatName {
    Text,
    Markdown,
    Html,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    #[serde(alias = "Success")]
    Success,
    #[serde(alias = "Failure", alias = "Failed", alias = "failed")]
    Failure,
    #[serde(alias = "Unknown")]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EvaluatorReply {
    pub evaluation: Evaluation,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub confidence: f64,
}

impl EvaluatorReply {
    pub fn is_success(&self) -> bool {
        self.evaluation == Evaluation::Success
    }
}

/// JSON schema of the reply expected from `role`.
pub fn response_schema(role: AgentRole) -> Value {
    let schema = match role {
        AgentRole::Planner => schema_for!(PlannerReply),
        AgentRole::Executor => schema_for!(ExecutorReply),
        AgentRole::Evaluator => schema_for!(EvaluatorReply),
    };
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").unwrap());

/// Pull the JSON object out of a model reply that may wrap it in a code
/// fence or surrounding prose.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let body = FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

pub(crate) fn parse_reply<T>(role: AgentRole, raw: &str) -> Result<T, AgentError>
where
    T: for<'de> Deserialize<'de>,
{
    let json = extract_json_object(raw)
        .ok_or_else(|| AgentError::malformed(role, "reply contains no JSON object"))?;
    serde_json::from_str(json).map_err(|err| AgentError::malformed(role, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_fences() {
        let raw = "Here you go:\n```json\n{\"evaluation\":\"success\"}\n```\n";
        assert_eq!(extract_json_object(raw), Some("{\"evaluation\":\"success\"}"));
        assert_eq!(extract_json_object("no json"), None);
    }

    #[test]
    fn evaluation_accepts_capitalized_variants() {
        let reply: EvaluatorReply =
            parse_reply(AgentRole::Evaluator, r#"{"evaluation":"Failed","reason":"popup"}"#).unwrap();
        assert_eq!(reply.evaluation, Evaluation::Failure);
        assert_eq!(reply.confidence, 0.0);
    }

    #[test]
    fn planner_reply_reads_step_type() {
        let reply: PlannerReply = parse_reply(
            AgentRole::Planner,
            r#"{"action_plan":[{"type":"checkpoint","description":"look","success_criteria":"seen","confidence_level":0.7}]}"#,
        )
        .unwrap();
        assert_eq!(reply.action_plan[0].kind, StepKind::Checkpoint);
    }

    #[test]
    fn malformed_reply_names_the_role() {
        let err = parse_reply::<ExecutorReply>(AgentRole::Executor, "{}").unwrap_err();
        assert!(matches!(err, AgentError::MalformedReply { role: AgentRole::Executor, .. }));
    }

    #[test]
    fn schemas_list_required_fields() {
        let schema = response_schema(AgentRole::Executor);
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "actions"));
        assert!(schema.to_string().contains("search_google"));
    }
}
