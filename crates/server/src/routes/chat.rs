//! Chatbot relay handler.
//!
//! Answers are always `{reply}`, including failures, so the chat widget can
//! show them as-is.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ApiJson;
use crate::state::AppState;

/// Chat message body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Chat reply body.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// POST /api/chatbot
#[instrument(skip_all)]
pub async fn relay(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ChatRequest>,
) -> (StatusCode, Json<ChatReply>) {
    let message = body.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatReply {
                reply: "Message cannot be empty.".to_string(),
            }),
        );
    }

    match state.chatbot().reply(message).await {
        Ok(reply) => (StatusCode::OK, Json(ChatReply { reply })),
        Err(e) => {
            tracing::error!(error = %e, "Chatbot relay failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatReply {
                    reply: "Sorry, I am unable to respond right now. Please try again later."
                        .to_string(),
                }),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn test_relays_reply() {
        let app = TestApp::new();
        let response = app
            .post("/api/chatbot", json!({ "message": "What are your hours?" }))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["reply"], "You said: What are your hours?");
    }

    #[tokio::test]
    async fn test_empty_message() {
        let app = TestApp::new();
        let response = app.post("/api/chatbot", json!({ "message": "  " })).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["reply"], "Message cannot be empty.");
    }

    #[tokio::test]
    async fn test_upstream_failure_apologises() {
        let app = TestApp::new();
        app.chatbot.set_failing(true);

        let response = app.post("/api/chatbot", json!({ "message": "hi" })).await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.json()["reply"].as_str().unwrap().starts_with("Sorry"));
    }
}
