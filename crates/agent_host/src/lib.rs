//! Agent Host - turns user prompts into assistant messages and artifacts
//!
//! This crate provides:
//! - The chat agent that talks to the completion backend
//! - Artifact extraction from raw tool-call payloads
//! - The code-generation system prompts

pub mod extractor;
pub mod prompts;

pub use extractor::extract_artifacts;
pub use prompts::{get_system_prompt, PromptKind};

use providers::tools::code_generation_tools;
use providers::{ChatCompletionClient, CompletionBackend, CompletionError};
use shared::agent_api::ChatMessage;
use shared::settings::AppSettings;
use std::sync::Arc;
use tracing::{info, warn};

/// Chat agent bound to one completion backend
pub struct ChatAgent {
    backend: Arc<dyn CompletionBackend>,
}

impl ChatAgent {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    pub fn from_settings(settings: &AppSettings) -> Result<Self, CompletionError> {
        let client = ChatCompletionClient::from_settings(&settings.api)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Send one user message. Returns `None` for blank input; otherwise
    /// always returns an assistant message, describing the failure when the
    /// request did not succeed.
    pub async fn send_message(&self, text: &str) -> Option<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let messages = [
            ChatMessage::system(get_system_prompt(PromptKind::Chat)),
            ChatMessage::user(text),
        ];

        match self.backend.complete(&messages, &code_generation_tools()).await {
            Ok(reply) => {
                let artifacts = extract_artifacts(std::slice::from_ref(&reply.raw));
                info!(
                    tool_calls = reply.tool_calls.len(),
                    artifacts = artifacts.len(),
                    "assistant reply received"
                );
                Some(
                    ChatMessage::assistant(reply.content)
                        .with_thinking(reply.thinking)
                        .with_tool_calls(reply.tool_calls)
                        .with_artifacts(artifacts),
                )
            }
            Err(e) => {
                warn!("completion failed: {}", e);
                Some(ChatMessage::assistant(format_failure(&e)))
            }
        }
    }

    /// One-shot generation. Returns the raw response messages for
    /// [`extract_artifacts`].
    pub async fn generate_code(
        &self,
        prompt: &str,
    ) -> Result<Vec<serde_json::Value>, CompletionError> {
        let messages = [
            ChatMessage::system(get_system_prompt(PromptKind::Generation)),
            ChatMessage::user(prompt),
        ];
        let reply = self
            .backend
            .complete(&messages, &code_generation_tools())
            .await?;
        Ok(vec![reply.raw])
    }
}

/// User-facing text for a failed completion
pub fn format_failure(err: &CompletionError) -> String {
    let detail = match err {
        CompletionError::Timeout(_) => {
            "Timeout: the request took too long. Please try again.".to_string()
        }
        CompletionError::Connection(_) => {
            "Connection error: cannot reach the completion API. Check your internet connection."
                .to_string()
        }
        other => other.to_string(),
    };

    format!(
        "**Code generation failed:**\n\n{}\n\n**Possible fixes:**\n\
         - Check your API key (settings or ARTIFACT_STUDIO_API_KEY)\n\
         - Make sure your internet connection is stable\n\
         - Try again in a few seconds\n\
         - If it keeps failing, try a simpler prompt",
        detail
    )
}
