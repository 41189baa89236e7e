use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{ChatMessage, ToolCall, ToolCallFunction};
use shared::settings::ApiSettings;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::CompletionError;
use crate::tools::ToolDefinition;

/// Environment variable consulted when the settings carry no key
pub const API_KEY_ENV: &str = "ARTIFACT_STUDIO_API_KEY";

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<serde_json::Value>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: String,
    function: ResponseToolCallFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// First choice of a completion response.
#[derive(Debug, Clone, Default)]
pub struct AssistantReply {
    pub content: String,
    pub thinking: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    /// The message object as received, for artifact extraction
    pub raw: serde_json::Value,
}

impl AssistantReply {
    fn from_message(raw: serde_json::Value) -> Result<Self, CompletionError> {
        let message: ResponseMessage = serde_json::from_value(raw.clone())
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let tool_calls = message
            .tool_calls
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                call_type: "function".to_string(),
                function: ToolCallFunction {
                    name: tc.function.name,
                    // Some endpoints send an object instead of a JSON string
                    arguments: match tc.function.arguments {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    },
                },
            })
            .collect();

        Ok(Self {
            content: message.content.unwrap_or_default(),
            thinking: message.thinking.or(message.reasoning_content),
            tool_calls,
            raw,
        })
    }
}

/// Anything that can answer a chat completion request.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply, CompletionError>;
}

fn to_wire_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content
            })
        })
        .collect()
}

// ── Client ───────────────────────────────────────────────────────────

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl ChatCompletionClient {
    pub fn new(
        base_url: &str,
        model: &str,
        auth_token: &str,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        if auth_token.trim().is_empty() {
            return Err(CompletionError::MissingApiKey);
        }
        let defaults = ApiSettings::default();
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| CompletionError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            auth_token: auth_token.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            timeout,
        })
    }

    /// Build from settings, falling back to [`API_KEY_ENV`] for the key.
    pub fn from_settings(api: &ApiSettings) -> Result<Self, CompletionError> {
        let key = api
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var(API_KEY_ENV).ok())
            .ok_or(CompletionError::MissingApiKey)?;

        let mut client = Self::new(
            &api.base_url,
            &api.model,
            &key,
            Duration::from_secs(api.timeout_secs),
        )?;
        client.max_tokens = api.max_tokens;
        client.temperature = api.temperature;
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let has_tools = !tools.is_empty();
        let req = CompletionRequest {
            model: &self.model,
            messages: to_wire_messages(messages),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
            tools: has_tools.then_some(tools),
            tool_choice: has_tools.then_some("auto"),
        };

        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "sending completion request");

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| CompletionError::from_transport(e, self.timeout))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            warn!(status, "completion request rejected");
            return Err(CompletionError::Api {
                status,
                body: detail,
            });
        }

        let body: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| CompletionError::from_transport(e, self.timeout))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("response carried no choices".into()))?;

        AssistantReply::from_message(choice.message)
    }
}
