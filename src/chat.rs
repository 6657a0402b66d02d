//! Remote chat-completion client.
//!
//! Defines the [`ChatModel`] seam and the [`RemoteChatModel`] implementation
//! that calls an OpenAI-compatible `POST {endpoint}/v1/chat/completions`
//! endpoint. Same policy as the embedding client: one attempt, failures map
//! to [`Error::RemoteService`] and propagate.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::error::{remote_error_message, Error, Result};

/// Request timeout for chat calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Cap on the generated answer length.
const MAX_RESPONSE_TOKENS: u32 = 250;

const TEMPERATURE: f64 = 0.5;

/// One message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Prompt-in, text-out capability of the hosted chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the full message sequence and return the assistant's reply.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Chat client backed by a hosted completion model.
pub struct RemoteChatModel {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl RemoteChatModel {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::remote("chat", e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for RemoteChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": MAX_RESPONSE_TOKENS,
            "temperature": TEMPERATURE,
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::remote("chat", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::remote(
                "chat",
                format!("HTTP {}: {}", status, remote_error_message(&body_text)),
            ));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::remote("chat", e.to_string()))?;

        let answer = parse_chat_response(&payload)?;
        debug!(model = %self.model, messages = messages.len(), "chat completion received");
        Ok(answer)
    }
}

/// Extract the assistant reply from a chat-completions response.
fn parse_chat_response(payload: &Value) -> Result<String> {
    payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| {
            Error::remote(
                "chat",
                "malformed response: missing choices[0].message.content",
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_chat_response_trims() {
        let payload = json!({
            "choices": [ { "message": { "role": "assistant", "content": "  An answer.\n" } } ]
        });
        assert_eq!(parse_chat_response(&payload).unwrap(), "An answer.");
    }

    #[test]
    fn test_parse_empty_choices_fails() {
        let payload = json!({ "choices": [] });
        assert!(parse_chat_response(&payload).is_err());
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");
    }

    #[test]
    fn test_messages_serialize_flat() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("q")];
        let value = serde_json::to_value(&messages).unwrap();
        assert_eq!(value[0]["role"], "system");
        assert_eq!(value[1]["content"], "q");
    }
}
