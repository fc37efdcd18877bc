//! Text-completion service used by the delegated parser.
//!
//! [`TextParsingService`] is the narrow seam the parser talks to: a prompt
//! (optionally with an image) goes in, the model's reply text comes out.
//! [`AnthropicService`] is the HTTP implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AiSettings;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub media_type: String,
    pub data: Vec<u8>,
}

impl ImageAttachment {
    /// Guess the media type from a file extension, defaulting to JPEG.
    pub fn from_path_bytes(path: &std::path::Path, data: Vec<u8>) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let media_type = match ext.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "image/jpeg",
        };
        ImageAttachment {
            media_type: media_type.to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub image: Option<ImageAttachment>,
}

#[derive(Debug, Error)]
pub enum ServiceFailure {
    #[error("service responded with HTTP {status}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response envelope: {0}")]
    Envelope(String),
}

#[async_trait]
pub trait TextParsingService: Send + Sync {
    /// Send one completion request and return the reply text.
    async fn complete(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<String, ServiceFailure>;
}

/// Anthropic Messages API client.
#[derive(Clone)]
pub struct AnthropicService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl AnthropicService {
    pub fn new(settings: &AiSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let content = match &request.image {
            Some(image) => serde_json::json!([
                {
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": image.media_type,
                        "data": BASE64_STANDARD.encode(&image.data),
                    }
                },
                { "type": "text", "text": request.prompt }
            ]),
            None => serde_json::Value::String(request.prompt.clone()),
        };
        serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": [{ "role": "user", "content": content }]
        })
    }
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[async_trait]
impl TextParsingService for AnthropicService {
    async fn complete(
        &self,
        credential: &str,
        request: &CompletionRequest,
    ) -> Result<String, ServiceFailure> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", credential)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| ServiceFailure::Transport(e.to_string()))?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            model = %self.model,
            "completion response"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Parsing service error {}: {}", status, body);
            return Err(ServiceFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ServiceFailure::Envelope(e.to_string()))?;
        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ServiceFailure::Envelope("no text block in response".to_string()))
    }
}
