//! Engine trait definitions for dependency injection

use async_trait::async_trait;
use serde_json::Value;

use shared::ProviderFailure;

use crate::types::ImagePayload;

/// Text generation seam: one call, one model, raw JSON back
///
/// Adapters shape transport results only; classification and sanitization
/// happen above this boundary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Ask `model` to answer `prompt` with a JSON document.
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<Value, ProviderFailure>;
}

/// Image generation seam: one call, one model, one image back
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Ask `model` to produce a single illustration for `prompt`.
    async fn generate_image(&self, model: &str, prompt: &str) -> Result<ImagePayload, ProviderFailure>;
}
