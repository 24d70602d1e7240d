//! Relay to the standalone chatbot service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

/// Errors talking to the chatbot.
#[derive(Debug, Error)]
pub enum ChatbotError {
    #[error("chatbot request failed: {0}")]
    Request(String),

    #[error("chatbot response error: {0}")]
    Response(String),
}

/// Answers a user's chat message.
#[async_trait]
pub trait Chatbot: Send + Sync {
    /// Get a reply for one message.
    ///
    /// # Errors
    ///
    /// Returns `ChatbotError` if the upstream cannot be reached or answers
    /// without a reply.
    async fn reply(&self, message: &str) -> Result<String, ChatbotError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    reply: String,
}

/// HTTP client for `{CHATBOT_URL}/chat`.
#[derive(Debug, Clone)]
pub struct ChatbotClient {
    client: Client,
    base_url: String,
}

impl ChatbotClient {
    /// Create a client for the chatbot at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Chatbot for ChatbotClient {
    #[instrument(skip(self, message))]
    async fn reply(&self, message: &str) -> Result<String, ChatbotError> {
        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&ChatRequest { message })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ChatbotError::Request(e.to_string()))?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatbotError::Response(e.to_string()))?;
        Ok(body.reply)
    }
}

/// Replies with a canned answer, or fails on demand.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct CannedChatbot {
    failing: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-support"))]
impl CannedChatbot {
    /// Create a chatbot that echoes every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent message (or answer again).
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Chatbot for CannedChatbot {
    async fn reply(&self, message: &str) -> Result<String, ChatbotError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(ChatbotError::Request("connection refused".to_string()));
        }
        Ok(format!("You said: {message}"))
    }
}
