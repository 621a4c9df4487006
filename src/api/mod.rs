use crate::config::AppConfig;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

pub mod gemini;
pub mod session;

use crate::api::gemini::GeminiClient;

/// Author of a conversation turn.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One message of a conversation.
///
/// Stored as `{"role": "...", "parts": [{"text": "..."}]}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "StoredTurn", into = "StoredTurn")]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredTurn {
    role: Role,
    #[serde(default)]
    parts: Vec<StoredPart>,
}

#[derive(Serialize, Deserialize)]
struct StoredPart {
    #[serde(default)]
    text: String,
}

impl From<StoredTurn> for Turn {
    fn from(stored: StoredTurn) -> Self {
        Self {
            role: stored.role,
            text: stored.parts.into_iter().map(|p| p.text).collect(),
        }
    }
}

impl From<Turn> for StoredTurn {
    fn from(turn: Turn) -> Self {
        Self {
            role: turn.role,
            parts: vec![StoredPart { text: turn.text }],
        }
    }
}

/// A web citation attached to a search-grounded answer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

impl GroundingSource {
    /// Title when present, else the raw URI.
    pub fn label(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.uri
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GroundedResponse {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

/// Trade-off between answer depth and latency for single-shot generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    /// Pro model with the maximum thinking budget.
    Deep,
    /// Lite model, no thinking, lowest latency.
    Fast,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("API response error ({status}): {body}")]
    Response { status: u16, body: String },
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Stream error: {0}")]
    Stream(String),
}

/// Lazily pulled sequence of text fragments from a streamed reply.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>;

/// Remote generative model operations used by the panes.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Streams the reply to `text`, given the prior turns of the session.
    async fn stream_chat(
        &self,
        history: Vec<Turn>,
        system_instruction: Option<String>,
        text: &str,
    ) -> Result<TextStream, ApiError>;

    async fn generate(&self, prompt: &str, tier: QualityTier) -> Result<String, ApiError>;

    async fn generate_grounded(&self, prompt: &str) -> Result<GroundedResponse, ApiError>;

    /// Returns a `data:` URI of the edited image, or `None` when the model
    /// answered without an image part.
    async fn edit_image(
        &self,
        image: Vec<u8>,
        mime_type: &str,
        instruction: &str,
    ) -> Result<Option<String>, ApiError>;
}

pub fn create_backend(config: &AppConfig) -> Arc<dyn GenerativeBackend> {
    Arc::new(GeminiClient::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serializes_with_parts() {
        let json = serde_json::to_string(&Turn::user("Merhaba")).unwrap();
        assert_eq!(json, r#"{"role":"user","parts":[{"text":"Merhaba"}]}"#);
    }

    #[test]
    fn test_turn_joins_multiple_parts() {
        let turn: Turn =
            serde_json::from_str(r#"{"role":"model","parts":[{"text":"a"},{"text":"b"}]}"#)
                .unwrap();
        assert_eq!(turn, Turn::model("ab"));
    }

    #[test]
    fn test_source_label_falls_back_to_uri() {
        let titled = GroundingSource {
            uri: "https://a.example".to_string(),
            title: "A".to_string(),
        };
        let untitled = GroundingSource {
            uri: "https://b.example".to_string(),
            title: String::new(),
        };
        assert_eq!(titled.label(), "A");
        assert_eq!(untitled.label(), "https://b.example");
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Response {
            status: 429,
            body: "quota".to_string(),
        };
        assert_eq!(format!("{}", err), "API response error (429): quota");
    }
}
