//! Google Gemini image provider using the `generateContent` REST API.
//!
//! Sends the car photo (and optional reference) as inline base64 parts and
//! asks for an image response modality.

use super::provider::{
    GenerateRequest, GenerateResponse, ImageProvider, InlineData, Part, RequestPart,
};
use crate::error::UpstreamError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Instant;

/// Gemini provider for image generation.
pub struct GeminiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

// --- Request types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

fn to_wire_part(part: &RequestPart) -> Part {
    match part {
        RequestPart::InlineImage { media_type, data } => Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: media_type.clone(),
                data: data.clone(),
            }),
        },
        RequestPart::Text(text) => Part {
            text: Some(text.clone()),
            inline_data: None,
        },
    }
}

/// Map a reqwest failure so that the message-based classifier recognises it.
fn transport_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Transport(format!("Gemini request timeout: {e}"))
    } else if e.is_connect() {
        UpstreamError::Transport(format!("Gemini connection failed: {e}"))
    } else {
        UpstreamError::Transport(format!("Gemini network error: {e}"))
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, UpstreamError> {
        let start = Instant::now();

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts: request.parts.iter().map(to_wire_part).collect(),
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        };

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                message: format!("Gemini HTTP {status}: {text}"),
            });
        }

        let bytes = resp.bytes().await.map_err(transport_error)?;
        let response: GenerateResponse = serde_json::from_slice(&bytes).map_err(|e| {
            UpstreamError::Malformed(format!("Failed to parse Gemini response: {e}"))
        })?;

        tracing::debug!(
            "Gemini {} answered in {}ms with {} candidate(s)",
            self.model,
            start.elapsed().as_millis(),
            response.candidates.len()
        );

        Ok(response)
    }
}
