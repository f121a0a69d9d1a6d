use std::time::Duration;

use agent_core::prompts::user_message;
use agent_core::{extract_json_object, AgentError, ConversationRole, ReasoningRequest, ReasoningService};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::config::GeminiSettings;

pub struct GeminiReasoner {
    client: Client,
    settings: GeminiSettings,
    api_key: String,
}

impl GeminiReasoner {
    pub fn new(settings: GeminiSettings) -> Result<Self, AgentError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AgentError::invalid_request("missing Gemini API key"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| {
                AgentError::invalid_request(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    fn body(&self, request: &ReasoningRequest) -> JsonValue {
        let mut contents: Vec<JsonValue> = request
            .history
            .iter()
            .map(|entry| match entry.role {
                ConversationRole::User => json!({
                    "role": "user",
                    "parts": [{"text": user_message(&entry.content, entry.elements.as_deref())}]
                }),
                ConversationRole::Assistant => json!({
                    "role": "model",
                    "parts": [{"text": entry.content}]
                }),
            })
            .collect();

        let mut parts = vec![json!({
            "text": user_message(&request.prompt, request.elements.as_deref())
        })];
        if let Some(shot) = &request.screenshot {
            parts.push(json!({"inline_data": {"mime_type": "image/png", "data": shot}}));
        }
        contents.push(json!({"role": "user", "parts": parts}));

        json!({
            "systemInstruction": {"parts": [{"text": request.system_prompt}]},
            "contents": contents,
            "generationConfig": {
                "temperature": self.settings.temperature,
                "topK": self.settings.top_k,
                "topP": self.settings.top_p,
                "maxOutputTokens": self.settings.max_output_tokens,
                "responseMimeType": "application/json",
                "responseSchema": gemini_schema(request.schema()),
            }
        })
    }
}

#[async_trait]
impl ReasoningService for GeminiReasoner {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, AgentError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.body(request))
            .send()
            .await
            .map_err(|err| AgentError::collaborator(format!("gemini request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(AgentError::collaborator(format!(
                "gemini returned {status}: {text}"
            )));
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| AgentError::collaborator(format!("gemini response invalid: {err}")))?;
        let text = response
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AgentError::collaborator("gemini response missing content"))?;
        debug!(role = %request.role, bytes = text.len(), "gemini reply received");

        Ok(extract_json_object(&text).unwrap_or(&text).to_string())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Gemini accepts an OpenAPI subset: no `$ref`, `definitions`, `$schema`,
/// `title`, `additionalProperties` or integer formats, no `null` in type
/// unions or `anyOf`, and string enums as a single `enum` list.
fn gemini_schema(schema: JsonValue) -> JsonValue {
    let definitions = schema
        .get("definitions")
        .cloned()
        .unwrap_or(JsonValue::Null);
    strip(schema, &definitions)
}

fn strip(value: JsonValue, definitions: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            if let Some(JsonValue::String(reference)) = map.get("$ref") {
                let name = reference.rsplit('/').next().unwrap_or_default();
                return strip(definitions[name].clone(), definitions);
            }
            if let Some(JsonValue::Array(all_of)) = map.get("allOf") {
                if let Some(first) = all_of.first() {
                    return strip(first.clone(), definitions);
                }
            }
            if let Some(JsonValue::Array(variants)) = map.get("anyOf") {
                if let Some(first) = variants.iter().find(|variant| variant["type"] != "null") {
                    return strip(first.clone(), definitions);
                }
            }
            if let Some(JsonValue::Array(variants)) = map.get("oneOf") {
                let values: Option<Vec<JsonValue>> = variants
                    .iter()
                    .map(|variant| variant.get("enum").and_then(JsonValue::as_array).cloned())
                    .collect::<Option<Vec<_>>>()
                    .map(|lists| lists.into_iter().flatten().collect());
                if let Some(values) = values {
                    return json!({"type": "string", "enum": values});
                }
            }
            let mut out = serde_json::Map::new();
            for (key, inner) in map {
                match key.as_str() {
                    "$schema" | "definitions" | "title" | "additionalProperties" | "default" | "format"
                    | "minimum" => {}
                    "type" => {
                        let kind = match inner {
                            JsonValue::Array(kinds) => kinds
                                .into_iter()
                                .find(|kind| *kind != "null")
                                .unwrap_or(JsonValue::String("string".to_string())),
                            other => other,
                        };
                        out.insert(key, kind);
                    }
                    "properties" => {
                        let properties = match inner {
                            JsonValue::Object(fields) => JsonValue::Object(
                                fields
                                    .into_iter()
                                    .map(|(name, field)| (name, strip(field, definitions)))
                                    .collect(),
                            ),
                            other => other,
                        };
                        out.insert(key, properties);
                    }
                    _ => {
                        out.insert(key, strip(inner, definitions));
                    }
                }
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => JsonValue::Array(
            items
                .into_iter()
                .map(|item| strip(item, definitions))
                .collect(),
        ),
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{response_schema, AgentRole};

    #[test]
    fn schema_is_flattened_for_gemini() {
        let schema = gemini_schema(response_schema(AgentRole::Planner));
        let text = schema.to_string();
        assert!(!text.contains("$ref"));
        assert!(!text.contains("definitions"));
        assert_eq!(schema["properties"]["action_plan"]["type"], "array");
        let kind = &schema["properties"]["action_plan"]["items"]["properties"]["type"];
        assert_eq!(kind["type"], "string");
        assert_eq!(kind["enum"], json!(["action", "checkpoint"]));

        let executor = gemini_schema(response_schema(AgentRole::Executor));
        let action = &executor["properties"]["actions"]["items"]["properties"];
        assert_eq!(action["format"]["type"], "string");
        assert_eq!(action["index"]["type"], "integer");
        assert!(action["index"].get("format").is_none());
    }

    #[test]
    fn body_carries_generation_config() {
        let reasoner = GeminiReasoner::new(GeminiSettings {
            api_key: Some("key".to_string()),
            ..GeminiSettings::default()
        })
        .unwrap();
        let request = ReasoningRequest::new(AgentRole::Executor, "sys", "act")
            .with_page(None, Some("aGk=".to_string()));
        let body = reasoner.body(&request);

        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["data"], "aGk=");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
    }
}
