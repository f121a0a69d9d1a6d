//! Core data types for action primitives

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dom_adapter::LiveDocument;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::errors::ActionError;

/// Execution context for one primitive call
///
/// Carries the document the primitive acts on, a cancellation token checked
/// before any interaction starts, and an id for log correlation.
#[derive(Clone)]
pub struct ExecCtx {
    pub doc: Arc<dyn LiveDocument>,
    pub cancel_token: CancellationToken,
    pub action_id: String,
}

impl ExecCtx {
    pub fn new(doc: Arc<dyn LiveDocument>, cancel_token: CancellationToken) -> Self {
        Self {
            doc,
            cancel_token,
            action_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub(crate) fn ensure_active(&self) -> Result<(), ActionError> {
        if self.is_cancelled() {
            return Err(ActionError::Interrupted("context cancelled".to_string()));
        }
        Ok(())
    }
}

/// Wire names accepted for `action`, including aliases.
pub const ACTION_NAMES: &[&str] = &[
    "click",
    "activate",
    "fill",
    "set_value",
    "search_google",
    "search",
    "go_to_url",
    "navigate",
    "go_back",
    "scroll_down",
    "scroll_up",
    "send_keys",
    "extract_content",
    "done",
];

/// One action requested by the executor collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// The closed action vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    #[serde(rename = "click", alias = "activate")]
    Activate {
        #[serde(deserialize_with = "index_from_any")]
        index: usize,
    },
    #[serde(rename = "fill", alias = "set_value")]
    SetValue {
        #[serde(deserialize_with = "index_from_any")]
        index: usize,
        value: String,
    },
    #[serde(rename = "search_google", alias = "search")]
    Search { query: String },
    #[serde(rename = "go_to_url", alias = "navigate")]
    Navigate { url: String },
    GoBack,
    ScrollDown {
        #[serde(default)]
        amount: Option<f64>,
    },
    ScrollUp {
        #[serde(default)]
        amount: Option<f64>,
    },
    SendKeys { keys: String },
    ExtractContent {
        #[serde(default)]
        format: ExtractFormat,
    },
    /// Terminates the task; the rest of the batch is skipped.
    Done {
        #[serde(default)]
        text: Option<String>,
    },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Activate { .. } => "click",
            ActionKind::SetValue { .. } => "fill",
            ActionKind::Search { .. } => "search_google",
            ActionKind::Navigate { .. } => "go_to_url",
            ActionKind::GoBack => "go_back",
            ActionKind::ScrollDown { .. } => "scroll_down",
            ActionKind::ScrollUp { .. } => "scroll_up",
            ActionKind::SendKeys { .. } => "send_keys",
            ActionKind::ExtractContent { .. } => "extract_content",
            ActionKind::Done { .. } => "done",
        }
    }

    /// Whether the page may change and needs to settle afterwards.
    pub fn changes_document(&self) -> bool {
        !matches!(
            self,
            ActionKind::ExtractContent { .. } | ActionKind::Done { .. }
        )
    }

    /// Whether the action replaces the loaded document.
    pub fn navigates(&self) -> bool {
        matches!(
            self,
            ActionKind::Search { .. } | ActionKind::Navigate { .. } | ActionKind::GoBack
        )
    }
}

impl AgentAction {
    /// Parse one raw collaborator action.
    pub fn from_value(raw: &Value) -> Result<Self, ActionError> {
        let name = raw
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::InvalidAction(format!("missing action name in {raw}")))?;
        if !ACTION_NAMES.contains(&name) {
            return Err(ActionError::UnknownAction(name.to_string()));
        }
        serde_json::from_value(raw.clone())
            .map_err(|err| ActionError::InvalidAction(format!("{name}: {err}")))
    }

    /// Parse a whole batch; any unknown or malformed entry rejects the batch.
    pub fn parse_batch(raw: &[Value]) -> Result<Vec<Self>, ActionError> {
        raw.iter().map(Self::from_value).collect()
    }
}

fn index_from_any<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .map(|v| v as usize)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid index {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<usize>()
            .map_err(|_| serde::de::Error::custom(format!("invalid index '{s}'"))),
        other => Err(serde::de::Error::custom(format!("invalid index {other}"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractFormat {
    #[default]
    Text,
    Markdown,
    Html,
}

/// Report for one successful primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    pub started_at: DateTime<Utc>,
    pub latency_ms: u64,
    /// Locator step that found the target, for indexed actions.
    pub located_by: Option<String>,
    pub content: Option<String>,
}

impl ActionReport {
    pub fn success(started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            started_at,
            latency_ms,
            located_by: None,
            content: None,
        }
    }

    pub fn with_locator(mut self, strategy: &str) -> Self {
        self.located_by = Some(strategy.to_string());
        self
    }

    pub fn with_content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }
}

/// Normalized result of one action, as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ActionOutcome {
    pub fn ok(action: &str) -> Self {
        Self {
            action: action.to_string(),
            success: true,
            error: None,
            content: None,
        }
    }

    pub fn failed(action: &str, error: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            success: false,
            error: Some(error.into()),
            content: None,
        }
    }
}

/// Timing knobs for the executor and primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub settle_delay_ms: u64,
    pub readiness_timeout_ms: u64,
    pub readiness_poll_ms: u64,
    pub keystroke_delay_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
            readiness_timeout_ms: 5000,
            readiness_poll_ms: 100,
            keystroke_delay_ms: 50,
        }
    }
}

impl ExecutorSettings {
    /// No artificial delays; used by tests and fixture runs.
    pub fn minimal() -> Self {
        Self {
            settle_delay_ms: 0,
            readiness_timeout_ms: 200,
            readiness_poll_ms: 10,
            keystroke_delay_ms: 0,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms.max(1))
    }

    pub fn keystroke_delay(&self) -> Duration {
        Duration::from_millis(self.keystroke_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_and_aliases() {
        let click = AgentAction::from_value(&json!({"action": "click", "index": 3, "description": "open"}))
            .unwrap();
        assert_eq!(click.kind, ActionKind::Activate { index: 3 });
        assert_eq!(click.description, "open");

        let fill = AgentAction::from_value(&json!({"action": "set_value", "index": "2", "value": "hello"}))
            .unwrap();
        assert_eq!(
            fill.kind,
            ActionKind::SetValue {
                index: 2,
                value: "hello".into()
            }
        );

        let back = AgentAction::from_value(&json!({"action": "go_back"})).unwrap();
        assert_eq!(back.kind, ActionKind::GoBack);

        let extract = AgentAction::from_value(&json!({"action": "extract_content"})).unwrap();
        assert_eq!(
            extract.kind,
            ActionKind::ExtractContent {
                format: ExtractFormat::Text
            }
        );
    }

    #[test]
    fn unknown_names_reject_the_batch() {
        let batch = vec![
            json!({"action": "click", "index": 0}),
            json!({"action": "hover", "index": 1}),
        ];
        assert_eq!(
            AgentAction::parse_batch(&batch),
            Err(ActionError::UnknownAction("hover".into()))
        );
        assert!(matches!(
            AgentAction::from_value(&json!({"action": "fill", "index": 1})),
            Err(ActionError::InvalidAction(_))
        ));
    }

    #[test]
    fn navigation_classification() {
        assert!(ActionKind::GoBack.navigates());
        assert!(ActionKind::Activate { index: 0 }.changes_document());
        assert!(!ActionKind::Done { text: None }.changes_document());
    }
}
