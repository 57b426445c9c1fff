//! Image provider trait and request/response types.
//!
//! The provider is an injected capability: the invoker only sees
//! `Arc<dyn ImageProvider>`, so tests can script retryable, fatal and
//! successful sequences without touching the network.

use crate::config::{resolve_env_var, GeminiConfig};
use crate::error::{ConfigError, UpstreamError};
use crate::request::{CallRequest, ImagePayload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One part of an upstream generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPart {
    /// Base64-encoded image
    InlineImage { media_type: String, data: String },
    /// Text instruction
    Text(String),
}

impl RequestPart {
    fn image(payload: &ImagePayload) -> Self {
        Self::InlineImage {
            media_type: payload.media_type.clone(),
            data: payload.to_base64(),
        }
    }
}

/// A multimodal generation request sent to the provider.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub parts: Vec<RequestPart>,
}

impl GenerateRequest {
    /// Build the background replacement request: car image, optional
    /// reference image, then the editing instruction.
    pub fn replace_background(request: &CallRequest) -> Self {
        let mut parts = vec![RequestPart::image(&request.primary_image)];

        let reference_hint = match &request.reference_image {
            Some(reference) => {
                parts.push(RequestPart::image(reference));
                "Use the SECOND image as a direct reference and inspiration for the new \
                 background, blending its style and content seamlessly.\n"
            }
            None => "",
        };

        let prompt = format!(
            "You are an expert automotive photo editor.\n\
             Your task is to replace ONLY the background of the primary car image.\n\
             {reference_hint}\
             The new background must match this description: \"{}\".\n\
             Crucially, the car in the foreground must remain completely untouched and \
             unchanged. Preserve all original details, lighting, reflections on the car, \
             and its physical form.\n\
             Integrate the car into the new background by generating realistic, natural, \
             and cinematic lighting, and ensure the ground shadows under the car are \
             contextually appropriate for the new scene.\n\
             Output only the final edited image. Do not output any text.",
            request.instruction.trim()
        );
        parts.push(RequestPart::Text(prompt));

        Self { parts }
    }
}

/// Structured provider response: candidates, each with content parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl GenerateResponse {
    /// Response carrying a single inline image in one candidate.
    pub fn with_image(mime_type: &str, data: &str) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: Some(vec![Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: data.to_string(),
                        }),
                    }]),
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
        }
    }

    /// Locate the inline image of the first candidate.
    ///
    /// On failure returns a short description of what was missing, including
    /// any finish or block reason the provider reported.
    pub fn first_inline_image(&self) -> Result<&InlineData, String> {
        let block_reason = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());

        let Some(candidate) = self.candidates.first() else {
            return Err(match block_reason {
                Some(reason) => format!("no candidates (prompt blocked: {reason})"),
                None => "no candidates".to_string(),
            });
        };

        let finish = candidate.finish_reason.as_deref().unwrap_or("unknown");
        let parts = candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.as_deref())
            .unwrap_or_default();
        if parts.is_empty() {
            return Err(format!("candidate has no content parts (finish reason: {finish})"));
        }

        parts
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .ok_or_else(|| format!("no inline image part (finish reason: {finish})"))
    }
}

/// Trait that all image providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the invoker holds `Arc<dyn ImageProvider>`).
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Provider name for logging (e.g., "gemini").
    fn name(&self) -> &str;

    /// Run one generation call. No retries, no deadline.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, UpstreamError>;
}

/// Build the configured provider.
///
/// The credential is checked here so that a missing key fails at startup,
/// not on the first request.
pub fn create_provider(config: &GeminiConfig) -> Result<Arc<dyn ImageProvider>, ConfigError> {
    let api_key = resolve_env_var(&config.api_key).ok_or_else(|| {
        let name = config
            .api_key
            .strip_prefix("${")
            .and_then(|v| v.strip_suffix('}'))
            .unwrap_or("gemini.api_key");
        ConfigError::MissingCredential {
            name: name.to_string(),
        }
    })?;

    Ok(Arc::new(super::gemini::GeminiProvider::new(
        &config.endpoint,
        &api_key,
        &config.model,
    )))
}
