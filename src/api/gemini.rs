//! Gemini `generateContent` client.
//!
//! Single-shot calls go to `models/{model}:generateContent`; chat replies are
//! streamed from `models/{model}:streamGenerateContent?alt=sse`.

use crate::api::{
    ApiError, GenerativeBackend, GroundedResponse, GroundingSource, QualityTier, Role, TextStream,
    Turn,
};
use crate::config::AppConfig;
use crate::constants::GEMINI_API_KEY_HEADER;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    complex_model: String,
    fast_model: String,
    grounded_model: String,
    image_model: String,
    thinking_budget: u32,
}

impl GeminiClient {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            chat_model: config.chat_model.clone(),
            complex_model: config.complex_model.clone(),
            fast_model: config.fast_model.clone(),
            grounded_model: config.grounded_model.clone(),
            image_model: config.image_model.clone(),
            thinking_budget: config.thinking_budget,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url,
            urlencoding::encode(model),
            method
        )
    }

    async fn post(
        &self,
        url: String,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response, ApiError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ApiError::Config("API key is missing".to_string()))?;

        let response = self
            .client
            .post(url)
            .header(GEMINI_API_KEY_HEADER, key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Response { status, body });
        }

        Ok(response)
    }

    async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiError> {
        let response = self
            .post(self.endpoint(model, "generateContent"), body)
            .await?;
        let bytes = response.bytes().await?;
        parse_response(&bytes)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn stream_chat(
        &self,
        history: Vec<Turn>,
        system_instruction: Option<String>,
        text: &str,
    ) -> Result<TextStream, ApiError> {
        let body = GenerateContentRequest {
            contents: chat_contents(&history, text),
            system_instruction: system_instruction.map(|s| Content::text(None, s)),
            ..Default::default()
        };
        let url = format!(
            "{}?alt=sse",
            self.endpoint(&self.chat_model, "streamGenerateContent")
        );
        tracing::debug!("Streaming chat turn ({} prior turns)", history.len());
        let response = self.post(url, &body).await?;

        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(ApiError::HttpClient))
            .scan(SseBuffer::default(), |buffer, item| {
                let fragments: Vec<Result<String, ApiError>> = match item {
                    Ok(bytes) => buffer
                        .push(&bytes)
                        .into_iter()
                        .filter_map(|data| match decode_stream_event(&data) {
                            Ok(text) if text.is_empty() => None,
                            other => Some(other),
                        })
                        .collect(),
                    Err(e) => vec![Err(e)],
                };
                futures::future::ready(Some(futures::stream::iter(fragments)))
            })
            .flatten();

        Ok(Box::pin(stream))
    }

    async fn generate(&self, prompt: &str, tier: QualityTier) -> Result<String, ApiError> {
        let (model, generation_config) = match tier {
            QualityTier::Deep => (
                &self.complex_model,
                Some(GenerationConfig {
                    thinking_config: Some(ThinkingConfig {
                        thinking_budget: self.thinking_budget,
                    }),
                    ..Default::default()
                }),
            ),
            QualityTier::Fast => (&self.fast_model, None),
        };
        let body = GenerateContentRequest {
            contents: vec![Content::text(Some(Role::User), prompt)],
            generation_config,
            ..Default::default()
        };

        let response = self.generate_content(model, &body).await?;
        Ok(response_text(&response))
    }

    async fn generate_grounded(&self, prompt: &str) -> Result<GroundedResponse, ApiError> {
        let body = GenerateContentRequest {
            contents: vec![Content::text(Some(Role::User), prompt)],
            tools: Some(vec![Tool {
                google_search: GoogleSearch {},
            }]),
            ..Default::default()
        };

        let response = self.generate_content(&self.grounded_model, &body).await?;
        let sources = grounding_sources(&response);
        tracing::info!("Grounded answer with {} source(s)", sources.len());
        Ok(GroundedResponse {
            text: response_text(&response),
            sources,
        })
    }

    async fn edit_image(
        &self,
        image: Vec<u8>,
        mime_type: &str,
        instruction: &str,
    ) -> Result<Option<String>, ApiError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some(Role::User),
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(&image),
                        }),
                        ..Default::default()
                    },
                    Part {
                        text: Some(instruction.to_string()),
                        ..Default::default()
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self.generate_content(&self.image_model, &body).await?;
        Ok(inline_image(&response))
    }
}

fn chat_contents(history: &[Turn], text: &str) -> Vec<Content> {
    history
        .iter()
        .map(|turn| Content::text(Some(turn.role), turn.text.as_str()))
        .chain(std::iter::once(Content::text(Some(Role::User), text)))
        .collect()
}

fn parse_response(bytes: &[u8]) -> Result<GenerateContentResponse, ApiError> {
    let response: GenerateContentResponse =
        serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(e.to_string()))?;
    if let Some(error) = &response.error {
        return Err(ApiError::Provider(error.message.clone()));
    }
    Ok(response)
}

fn decode_stream_event(data: &str) -> Result<String, ApiError> {
    parse_response(data.as_bytes()).map(|response| response_text(&response))
}

/// Concatenated non-thought text parts of the first candidate.
fn response_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter(|p| !p.thought.unwrap_or(false))
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default()
}

fn grounding_sources(response: &GenerateContentResponse) -> Vec<GroundingSource> {
    response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|metadata| {
            metadata
                .grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref())
                .map(|web| GroundingSource {
                    uri: web.uri.clone().unwrap_or_default(),
                    title: web.title.clone().unwrap_or_default(),
                })
                .filter(|source| !source.uri.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn inline_image(response: &GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.iter().find_map(|p| p.inline_data.as_ref()))
        .map(|data| format!("data:{};base64,{}", data.mime_type, data.data))
}

/// Accumulates raw SSE bytes and yields complete `data:` payloads.
///
/// Lines are only decoded once their terminating newline has arrived, so a
/// multi-byte character split across network chunks is reassembled intact.
#[derive(Default)]
struct SseBuffer {
    pending: Vec<u8>,
}

impl SseBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(line_end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim_start();
                if !data.is_empty() {
                    payloads.push(data.to_string());
                }
            }
        }
        payloads
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<Role>, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part {
                text: Some(text.into()),
                ..Default::default()
            }],
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ProviderError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}
