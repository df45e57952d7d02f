//! OpenAI provider adapter
//!
//! Text goes through chat completions in JSON mode; images go through the
//! images endpoint. Same contract as the Gemini adapter: shape results,
//! pass failures through raw.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use shared::ProviderFailure;

use crate::services::{error_message, parse_model_json};
use crate::traits::{ImageGenerator, TextGenerator};
use crate::types::ImagePayload;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self::with_base_url(client, api_key, OPENAI_BASE_URL)
    }

    /// Base URL override for tests running against a local mock server.
    pub fn with_base_url(client: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderFailure> {
        let url = format!("{}{}", self.base_url, path);
        debug!("🌐 OpenAI request: {}", path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<Value, ProviderFailure> {
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {"type": "json_object"},
            "temperature": 0.9
        });

        let response = self.post_json("/chat/completions", &body).await?;
        let content = response
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| ProviderFailure::EmptyPayload("no content in response".to_string()))?;
        parse_model_json(content)
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(&self, model: &str, prompt: &str) -> Result<ImagePayload, ProviderFailure> {
        let mut body = json!({
            "model": model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024"
        });
        // gpt-image models reject the parameter and always return base64
        if model.starts_with("dall-e") {
            body["response_format"] = json!("b64_json");
        }

        let response = self.post_json("/images/generations", &body).await?;
        let item = response
            .get("data")
            .and_then(|data| data.get(0))
            .ok_or_else(|| ProviderFailure::EmptyPayload("no image in response".to_string()))?;

        if let Some(data) = item.get("b64_json").and_then(|data| data.as_str()) {
            return Ok(ImagePayload::Base64 {
                data: data.to_string(),
                media_type: "image/png".to_string(),
            });
        }
        if let Some(url) = item.get("url").and_then(|url| url.as_str()) {
            return Ok(ImagePayload::Url(url.to_string()));
        }
        Err(ProviderFailure::MalformedPayload(
            "image item carries neither b64_json nor url".to_string(),
        ))
    }
}
