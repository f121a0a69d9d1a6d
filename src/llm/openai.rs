use std::time::Duration;

use agent_core::prompts::user_message;
use agent_core::{AgentError, ConversationRole, ReasoningRequest, ReasoningService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::config::OpenAiSettings;

pub struct OpenAiReasoner {
    client: Client,
    settings: OpenAiSettings,
}

impl OpenAiReasoner {
    pub fn new(settings: OpenAiSettings) -> Result<Self, AgentError> {
        if settings.api_keys.iter().all(|key| key.trim().is_empty()) {
            return Err(AgentError::invalid_request("missing OpenAI API key"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| {
                AgentError::invalid_request(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self { client, settings })
    }

    fn body(&self, request: &ReasoningRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: JsonValue::String(request.system_prompt.clone()),
        });
        for entry in &request.history {
            let (role, content) = match entry.role {
                ConversationRole::User => (
                    "user",
                    user_message(&entry.content, entry.elements.as_deref()),
                ),
                ConversationRole::Assistant => ("assistant", entry.content.clone()),
            };
            messages.push(ChatMessage {
                role,
                content: JsonValue::String(content),
            });
        }

        let text = user_message(&request.prompt, request.elements.as_deref());
        let content = match &request.screenshot {
            Some(shot) => json!([
                {"type": "text", "text": text},
                {"type": "image_url", "image_url": {"url": format!("data:image/png;base64,{shot}")}}
            ]),
            None => JsonValue::String(text),
        };
        messages.push(ChatMessage {
            role: "user",
            content,
        });

        ChatCompletionRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": format!("{}_reply", request.role),
                    "schema": request.schema(),
                    "strict": false
                }
            }),
            messages,
        }
    }
}

#[async_trait]
impl ReasoningService for OpenAiReasoner {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, AgentError> {
        let url = format!(
            "{}/chat/completions",
            self.settings.api_base.trim_end_matches('/')
        );
        let body = self.body(request);
        let keys: Vec<&String> = self
            .settings
            .api_keys
            .iter()
            .filter(|key| !key.trim().is_empty())
            .collect();

        let mut last_error: Option<AgentError> = None;
        for (index, key) in keys.iter().enumerate() {
            let response = match self
                .client
                .post(&url)
                .bearer_auth(key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = Some(AgentError::collaborator(format!(
                        "openai request failed: {err}"
                    )));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < keys.len() {
                    let friendly = rate_limit_message(&text);
                    warn!(
                        target: "openai",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = keys.len() - index - 1,
                        "rate limited; switching API key"
                    );
                    last_error = Some(AgentError::collaborator(friendly));
                    continue;
                }
                return Err(AgentError::collaborator(format!(
                    "openai returned {status}: {text}"
                )));
            }

            let response: ChatCompletionResponse = response.json().await.map_err(|err| {
                AgentError::collaborator(format!("openai response invalid: {err}"))
            })?;
            if let Some(usage) = &response.usage {
                debug!(
                    target: "openai",
                    role = %request.role,
                    input_tokens = usage.prompt_tokens,
                    output_tokens = usage.completion_tokens,
                    "completion received"
                );
            }
            return response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_text())
                .ok_or_else(|| AgentError::collaborator("openai response missing content"));
        }

        Err(last_error
            .unwrap_or_else(|| AgentError::collaborator("openai request exhausted all API keys")))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    max_tokens: u32,
    response_format: JsonValue,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: JsonValue,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                (!text.is_empty()).then_some(text)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorMessage {
    message: Option<String>,
}

fn rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<OpenAiErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!("OpenAI rate limit exceeded: {}", message.trim());
        }
    }
    "OpenAI rate limit exceeded; retry later".to_string()
}
