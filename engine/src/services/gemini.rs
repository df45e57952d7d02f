//! Gemini provider adapter
//!
//! One REST client serves both seams: `generateContent` returns JSON text
//! for worksheet prompts and inline image data for image-capable models.
//! The adapter only shapes raw results and raw failures; retry and
//! classification decisions belong to the caller.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use shared::ProviderFailure;

use crate::services::{error_message, parse_model_json};
use crate::traits::{ImageGenerator, TextGenerator};
use crate::types::ImagePayload;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self::with_base_url(client, api_key, GEMINI_BASE_URL)
    }

    /// Base URL override for tests running against a local mock server.
    pub fn with_base_url(client: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<Value, ProviderFailure> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );
        debug!("🌐 Gemini request: model {}", model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Http {
                status: status.as_u16(),
                message: error_message(&body_text),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderFailure::MalformedPayload(format!("unparseable response body: {e}")))
    }
}

/// First part of the first candidate that carries `key`.
fn first_part<'a>(response: &'a Value, key: &str) -> Option<&'a Value> {
    response
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array())
        .and_then(|parts| parts.iter().find(|part| part.get(key).is_some()))
        .and_then(|part| part.get(key))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<Value, ProviderFailure> {
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.9
            }
        });

        let response = self.generate_content(model, &body).await?;
        let text = first_part(&response, "text")
            .and_then(|text| text.as_str())
            .ok_or_else(|| ProviderFailure::EmptyPayload("no text part in response".to_string()))?;
        parse_model_json(text)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_image(&self, model: &str, prompt: &str) -> Result<ImagePayload, ProviderFailure> {
        // image-capable models want both modalities requested, and still
        // interleave text parts with the image part
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"]
            }
        });

        let response = self.generate_content(model, &body).await?;
        let inline = first_part(&response, "inlineData")
            .ok_or_else(|| ProviderFailure::EmptyPayload("no image part in response".to_string()))?;
        let data = inline
            .get("data")
            .and_then(|data| data.as_str())
            .ok_or_else(|| {
                ProviderFailure::MalformedPayload("image part carries no data".to_string())
            })?;
        let media_type = inline
            .get("mimeType")
            .and_then(|mime| mime.as_str())
            .unwrap_or("image/png");

        Ok(ImagePayload::Base64 {
            data: data.to_string(),
            media_type: media_type.to_string(),
        })
    }
}
