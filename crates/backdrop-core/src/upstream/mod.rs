//! Upstream image generation.
//!
//! Provides the provider abstraction the resilience layer calls through and
//! the Gemini implementation used in production.

pub(crate) mod gemini;
pub mod provider;

pub use gemini::GeminiProvider;
pub use provider::{
    create_provider, GenerateRequest, GenerateResponse, ImageProvider, InlineData, RequestPart,
};
