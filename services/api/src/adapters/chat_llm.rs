//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the conversational LLM.
//! It implements the `ModelClient` port from the `core` crate against any
//! OpenAI-compatible chat completions endpoint (OpenAI itself, or Gemini's
//! compatibility layer).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use chat_core::domain::{Message, Role};
use chat_core::ports::{ConversationHandle, ModelClient, ModelError};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ModelClient` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// The request payload: prior turns followed by the new user text.
    fn build_messages(
        history: &[Message],
        text: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        for message in history {
            messages.push(to_request_message(message.role, &message.content)?);
        }
        messages.push(to_request_message(Role::User, text)?);
        Ok(messages)
    }
}

fn to_request_message(role: Role, content: &str) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let message = match role {
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(message)
}

/// Sorts provider failures into the kinds the core understands.
pub fn classify_error(error: OpenAIError) -> ModelError {
    match error {
        OpenAIError::Reqwest(e) => ModelError::Network(e.to_string()),
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.as_deref().unwrap_or_default();
            let message = api.message.to_lowercase();
            if is_quota_failure(kind, &message) {
                ModelError::QuotaExceeded(api.message)
            } else {
                ModelError::Unavailable(api.message)
            }
        }
        other => ModelError::Unavailable(other.to_string()),
    }
}

fn is_quota_failure(kind: &str, message: &str) -> bool {
    kind == "insufficient_quota"
        || kind == "rate_limit_exceeded"
        || message.contains("quota")
        || message.contains("rate limit")
        || message.contains("resource has been exhausted")
}

//=========================================================================================
// `ModelClient` Trait Implementation
//=========================================================================================

#[async_trait]
impl ModelClient for OpenAiChatAdapter {
    async fn send_turn(
        &self,
        conversation: &mut ConversationHandle,
        text: &str,
    ) -> Result<String, ModelError> {
        let messages = Self::build_messages(conversation.history(), text)
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;
        debug!(
            "Sending turn to {} with {} messages of history",
            self.model,
            conversation.history().len()
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_error)?;

        let reply = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ModelError::Unavailable("The model returned no reply".to_string()))?;

        conversation.record_turn(text, &reply);
        Ok(reply)
    }
}
